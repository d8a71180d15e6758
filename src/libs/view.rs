use crate::libs::domain::{DomainRecord, Period};
use crate::libs::formatter::{format_limit, format_time};
use anyhow::Result;
use chrono::{DateTime, Utc};
use prettytable::{row, Table};
use std::collections::BTreeMap;

/// One line of the usage table, in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRow {
    pub domain: String,
    pub today: u64,
    pub week: u64,
    pub total: u64,
    pub daily_limit: u64,
    pub weekly_limit: u64,
}

impl StatsRow {
    /// Rows for every record, busiest today first, ties broken by total then name.
    pub fn collect(records: &BTreeMap<String, DomainRecord>, now: DateTime<Utc>) -> Vec<StatsRow> {
        let mut rows: Vec<StatsRow> = records
            .iter()
            .map(|(domain, record)| StatsRow {
                domain: domain.clone(),
                today: record.spent(Period::Daily, now),
                week: record.spent(Period::Weekly, now),
                total: record.total_time,
                daily_limit: record.limits.daily,
                weekly_limit: record.limits.weekly,
            })
            .collect();
        rows.sort_by(|a, b| b.today.cmp(&a.today).then(b.total.cmp(&a.total)).then(a.domain.cmp(&b.domain)));
        rows
    }
}

pub struct View {}

impl View {
    pub fn stats(rows: &[StatsRow]) -> Result<()> {
        let mut table = Table::new();

        table.add_row(row!["DOMAIN", "TODAY", "THIS WEEK", "TOTAL", "DAILY LIMIT", "WEEKLY LIMIT"]);
        for stats in rows {
            table.add_row(row![
                stats.domain,
                format_time(stats.today),
                format_time(stats.week),
                format_time(stats.total),
                format_limit(stats.daily_limit),
                format_limit(stats.weekly_limit)
            ]);
        }
        table.printstd();

        Ok(())
    }
}
