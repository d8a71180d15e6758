//! Persisted per-domain usage record and its calendar buckets.
//!
//! A [`DomainRecord`] is created lazily on the first flush for a domain and is
//! keyed by the normalized host name. Day buckets are keyed by the local
//! calendar date (`%Y-%m-%d`), week buckets by the local date of the Monday
//! that starts the week.
//!
//! Counters only grow through [`DomainRecord::credit`], which adds the same
//! number of seconds to the day bucket, the week bucket and the total, so the
//! total never falls below any single day.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Largest daily limit accepted from the user, in minutes.
pub const MAX_DAILY_LIMIT_MINUTES: u64 = 1440;
/// Largest weekly limit accepted from the user, in minutes.
pub const MAX_WEEKLY_LIMIT_MINUTES: u64 = 10_080;

/// Calendar key format shared by day and week buckets.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Limit period evaluated by the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Daily, Period::Weekly];

    /// Key used in the persisted `lastNotification` map.
    pub fn key(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Daily => write!(f, "Daily"),
            Period::Weekly => write!(f, "Weekly"),
        }
    }
}

/// Configured limits in seconds; `0` means unset.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    #[serde(default)]
    pub daily: u64,
    #[serde(default)]
    pub weekly: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimitError {
    #[error("Daily limit must be between 0-1440 minutes, got {0}")]
    DailyOutOfRange(u64),
    #[error("Weekly limit must be between 0-10080 minutes, got {0}")]
    WeeklyOutOfRange(u64),
    #[error("Weekly limit cannot be less than daily limit")]
    WeeklyBelowDaily,
}

impl Limits {
    /// Builds limits from user-entered minutes. `0` leaves a period unset.
    pub fn from_minutes(daily: u64, weekly: u64) -> Result<Self, LimitError> {
        if daily > MAX_DAILY_LIMIT_MINUTES {
            return Err(LimitError::DailyOutOfRange(daily));
        }
        if weekly > MAX_WEEKLY_LIMIT_MINUTES {
            return Err(LimitError::WeeklyOutOfRange(weekly));
        }
        if daily > 0 && weekly > 0 && weekly < daily {
            return Err(LimitError::WeeklyBelowDaily);
        }
        Ok(Limits {
            daily: daily * 60,
            weekly: weekly * 60,
        })
    }

    pub fn get(&self, period: Period) -> u64 {
        match period {
            Period::Daily => self.daily,
            Period::Weekly => self.weekly,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    #[serde(default)]
    pub daily_time: BTreeMap<String, u64>,
    #[serde(default)]
    pub weekly_time: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_time: u64,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub last_notification: BTreeMap<String, DateTime<Utc>>,
}

impl DomainRecord {
    /// Adds `seconds` to the buckets that contain `at` and to the total.
    pub fn credit(&mut self, seconds: u64, at: DateTime<Utc>) {
        *self.daily_time.entry(day_key(at)).or_insert(0) += seconds;
        *self.weekly_time.entry(week_key(at)).or_insert(0) += seconds;
        self.total_time += seconds;
    }

    /// Accumulated seconds for the period containing `at`.
    pub fn spent(&self, period: Period, at: DateTime<Utc>) -> u64 {
        match period {
            Period::Daily => self.daily_time.get(&day_key(at)).copied().unwrap_or(0),
            Period::Weekly => self.weekly_time.get(&week_key(at)).copied().unwrap_or(0),
        }
    }

    /// Zeroes the bucket of the period containing `at`. Used by explicit user resets only.
    pub fn reset_period(&mut self, period: Period, at: DateTime<Utc>) {
        match period {
            Period::Daily => {
                if let Some(seconds) = self.daily_time.get_mut(&day_key(at)) {
                    *seconds = 0;
                }
            }
            Period::Weekly => {
                if let Some(seconds) = self.weekly_time.get_mut(&week_key(at)) {
                    *seconds = 0;
                }
            }
        }
    }

    /// Drops day buckets more than `keep_days` days before `today`. Returns the number removed.
    pub fn prune_days(&mut self, today: NaiveDate, keep_days: i64) -> usize {
        prune_buckets(&mut self.daily_time, |date| (today - date).num_days() > keep_days)
    }

    /// Drops week buckets more than `keep_weeks` weeks before `today`. Returns the number removed.
    pub fn prune_weeks(&mut self, today: NaiveDate, keep_weeks: i64) -> usize {
        prune_buckets(&mut self.weekly_time, |week| (today - week).num_weeks() > keep_weeks)
    }

    pub fn stamp_notification(&mut self, period: Period, at: DateTime<Utc>) {
        self.last_notification.insert(period.key().to_string(), at);
    }
}

fn prune_buckets(buckets: &mut BTreeMap<String, u64>, expired: impl Fn(NaiveDate) -> bool) -> usize {
    let before = buckets.len();
    // Keys that do not parse are left alone; they were not written by this crate.
    buckets.retain(|key, _| match NaiveDate::parse_from_str(key, DATE_KEY_FORMAT) {
        Ok(date) => !expired(date),
        Err(_) => true,
    });
    before - buckets.len()
}

/// Local calendar date of an instant.
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// Monday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn day_key(at: DateTime<Utc>) -> String {
    local_date(at).format(DATE_KEY_FORMAT).to_string()
}

pub fn week_key(at: DateTime<Utc>) -> String {
    week_start(local_date(at)).format(DATE_KEY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_start_is_monday() {
        let sunday = NaiveDate::from_ymd_opt(2025, 1, 19).unwrap();
        let monday = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        assert_eq!(week_start(sunday), monday);
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn credit_keeps_total_above_daily() {
        let mut record = DomainRecord::default();
        let at = Utc::now();
        record.credit(12, at);
        record.credit(3, at);
        assert_eq!(record.spent(Period::Daily, at), 15);
        assert_eq!(record.spent(Period::Weekly, at), 15);
        assert_eq!(record.total_time, 15);
    }

    #[test]
    fn prune_days_keeps_last_week() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let mut record = DomainRecord::default();
        for offset in [0, 7, 8, 30] {
            let key = (today - Duration::days(offset)).format(DATE_KEY_FORMAT).to_string();
            record.daily_time.insert(key, 10);
        }
        record.daily_time.insert("Thu Mar 20 2025".to_string(), 5);

        assert_eq!(record.prune_days(today, 7), 2);
        assert_eq!(record.daily_time.len(), 3);
    }

    #[test]
    fn limits_from_minutes_validates() {
        assert_eq!(Limits::from_minutes(30, 120).unwrap(), Limits { daily: 1800, weekly: 7200 });
        assert_eq!(Limits::from_minutes(30, 0).unwrap().weekly, 0);
        assert_eq!(Limits::from_minutes(1441, 0), Err(LimitError::DailyOutOfRange(1441)));
        assert_eq!(Limits::from_minutes(0, 10_081), Err(LimitError::WeeklyOutOfRange(10_081)));
        assert_eq!(Limits::from_minutes(60, 30), Err(LimitError::WeeklyBelowDaily));
    }

    #[test]
    fn reset_period_only_touches_current_bucket() {
        let at = Utc::now();
        let mut record = DomainRecord::default();
        record.credit(40, at);
        record.reset_period(Period::Daily, at);
        assert_eq!(record.spent(Period::Daily, at), 0);
        assert_eq!(record.spent(Period::Weekly, at), 40);
        assert_eq!(record.total_time, 40);
    }
}
