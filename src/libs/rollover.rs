//! Periodic maintenance of the calendar buckets.
//!
//! The daily rollover fires at local midnight and drops day buckets older than
//! a week; the weekly rollover fires on Monday at 00:00 and drops week buckets
//! older than four weeks. Totals are never touched.

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::db::DomainStore;
use crate::libs::domain::DomainRecord;

/// Day buckets kept by the daily rollover.
pub const KEEP_DAYS: i64 = 7;
/// Week buckets kept by the weekly rollover.
pub const KEEP_WEEKS: i64 = 4;

/// First local midnight strictly after `now`.
pub fn next_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.with_timezone(&Local).date_naive() + Duration::days(1);
    local_start_of(tomorrow)
}

/// First local Monday 00:00 strictly after `now`.
pub fn next_monday(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.with_timezone(&Local).date_naive();
    let days_ahead = 7 - today.weekday().num_days_from_monday() as i64;
    local_start_of(today + Duration::days(days_ahead))
}

fn local_start_of(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST jump; the hour after it exists.
        None => Local
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc)),
    }
}

/// Drops day buckets older than [`KEEP_DAYS`] in every record. Returns how many were dropped.
pub async fn prune_days(store: &dyn DomainStore, today: NaiveDate) -> Result<usize> {
    prune(store, move |record| record.prune_days(today, KEEP_DAYS)).await
}

/// Drops week buckets older than [`KEEP_WEEKS`] in every record. Returns how many were dropped.
pub async fn prune_weeks(store: &dyn DomainStore, today: NaiveDate) -> Result<usize> {
    prune(store, move |record| record.prune_weeks(today, KEEP_WEEKS)).await
}

async fn prune<F>(store: &dyn DomainStore, pruner: F) -> Result<usize>
where
    F: Fn(&mut DomainRecord) -> usize + Clone + Send + 'static,
{
    let pruned = Arc::new(AtomicUsize::new(0));
    for domain in store.list().await?.into_keys() {
        let pruned = Arc::clone(&pruned);
        let pruner = pruner.clone();
        // Records removed since the listing stay removed.
        store
            .update_existing(
                &domain,
                Box::new(move |record| {
                    pruned.fetch_add(pruner(record), Ordering::Relaxed);
                }),
            )
            .await?;
    }
    Ok(pruned.load(Ordering::Relaxed))
}
