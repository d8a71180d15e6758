//! Limit evaluation and alert delivery.
//!
//! After each successful flush the engine hands the fresh record to
//! [`LimitNotifier::evaluate`]. For each period with a limit set, an alert is
//! produced when the accumulated time strictly exceeds the limit and no alert
//! for the same `(domain, period)` went out within the cooldown. An alert only
//! counts as sent once [`LimitNotifier::mark_sent`] records its delivery, so a
//! failed delivery is retried on the next flush. The throttle lives in memory only and starts empty after a restart; the daily rollover
//! clears it as well.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

use crate::libs::domain::{DomainRecord, Period};
use crate::libs::formatter::format_time;
use crate::libs::messages::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitAlert {
    pub domain: String,
    pub period: Period,
    /// Seconds accumulated in the period.
    pub spent: u64,
    /// Configured limit in seconds.
    pub limit: u64,
    pub at: DateTime<Utc>,
}

impl LimitAlert {
    /// Identifier unique per alert, stable for a given domain, period and instant.
    pub fn id(&self) -> String {
        format!("{}-{}-{}", self.domain, self.period.key(), self.at.timestamp_millis())
    }

    pub fn title(&self) -> String {
        Message::LimitAlertTitle.to_string()
    }

    pub fn body(&self) -> String {
        Message::LimitExceeded {
            domain: self.domain.clone(),
            period: self.period.to_string(),
            spent: format_time(self.spent),
            limit: format_time(self.limit),
        }
        .to_string()
    }
}

/// Delivers alerts to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &LimitAlert) -> Result<()>;
}

/// Writes alerts to the log. Used when no host is attached to display them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &LimitAlert) -> Result<()> {
        tracing::warn!(domain = %alert.domain, period = %alert.period, "{}", alert.body());
        Ok(())
    }
}

/// Per-(domain, period) alert throttle.
#[derive(Debug)]
pub struct LimitNotifier {
    cooldown: TimeDelta,
    sent: HashMap<(String, Period), DateTime<Utc>>,
}

impl LimitNotifier {
    pub fn new(cooldown: TimeDelta) -> Self {
        Self {
            cooldown,
            sent: HashMap::new(),
        }
    }

    /// Returns the alerts due for `record`.
    pub fn evaluate(&self, domain: &str, record: &DomainRecord, now: DateTime<Utc>) -> Vec<LimitAlert> {
        let mut alerts = Vec::new();
        for period in Period::ALL {
            let limit = record.limits.get(period);
            if limit == 0 {
                continue;
            }
            let spent = record.spent(period, now);
            if spent <= limit {
                continue;
            }
            if let Some(last) = self.sent.get(&(domain.to_string(), period)) {
                if now - *last <= self.cooldown {
                    continue;
                }
            }
            alerts.push(LimitAlert {
                domain: domain.to_string(),
                period,
                spent,
                limit,
                at: now,
            });
        }
        alerts
    }

    /// Starts the cooldown for the alert's domain and period.
    pub fn mark_sent(&mut self, alert: &LimitAlert) {
        self.sent.insert((alert.domain.clone(), alert.period), alert.at);
    }

    /// Forgets every throttle entry.
    pub fn reset(&mut self) {
        self.sent.clear();
    }
}
