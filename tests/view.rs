#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone, Utc};
    use std::collections::BTreeMap;
    use timeup::libs::domain::{DomainRecord, Limits};
    use timeup::libs::view::{StatsRow, View};

    #[test]
    fn test_stats_rows_sorted_by_today() {
        let now = Local.with_ymd_and_hms(2025, 3, 19, 12, 0, 0).unwrap().with_timezone(&Utc);
        let yesterday = now - chrono::Duration::days(1);

        let mut records = BTreeMap::new();
        let mut quiet = DomainRecord::default();
        quiet.credit(5000, yesterday);
        records.insert("quiet.com".to_string(), quiet);

        let mut busy = DomainRecord {
            limits: Limits { daily: 1800, weekly: 0 },
            ..Default::default()
        };
        busy.credit(120, now);
        records.insert("busy.com".to_string(), busy);

        let mut tied = DomainRecord::default();
        tied.credit(120, now);
        records.insert("also.com".to_string(), tied);

        let rows = StatsRow::collect(&records, now);
        let order: Vec<&str> = rows.iter().map(|row| row.domain.as_str()).collect();
        assert_eq!(order, vec!["also.com", "busy.com", "quiet.com"]);
        assert_eq!(rows[1].daily_limit, 1800);
        assert_eq!(rows[2].today, 0);
        assert_eq!(rows[2].total, 5000);

        assert!(View::stats(&rows).is_ok());
    }
}
