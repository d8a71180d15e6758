#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone, Utc};
    use rusqlite::Connection;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use test_context::{test_context, AsyncTestContext};
    use timeup::db::{domains::Domains, DomainStore};
    use timeup::libs::domain::{DomainRecord, Limits, Period};

    struct DomainsTestContext {
        _temp_dir: TempDir,
        path: PathBuf,
        domains: Domains,
    }

    impl AsyncTestContext for DomainsTestContext {
        async fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let path = temp_dir.path().join("timeup.db");
            let domains = Domains::open(&path).unwrap();
            DomainsTestContext {
                _temp_dir: temp_dir,
                path,
                domains,
            }
        }
    }

    #[test_context(DomainsTestContext)]
    #[tokio::test]
    async fn test_update_creates_record_lazily(ctx: &mut DomainsTestContext) {
        let at = Utc::now();
        assert_eq!(ctx.domains.read("a.com").await.unwrap(), None);

        let record = ctx.domains.update("a.com", Box::new(move |record| record.credit(12, at))).await.unwrap();
        assert_eq!(record.total_time, 12);

        let stored = ctx.domains.read("a.com").await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert_eq!(stored.spent(Period::Daily, at), 12);
    }

    #[test_context(DomainsTestContext)]
    #[tokio::test]
    async fn test_update_rereads_external_edits(ctx: &mut DomainsTestContext) {
        let at = Local.with_ymd_and_hms(2025, 3, 19, 12, 0, 0).unwrap().with_timezone(&Utc);
        ctx.domains.update("a.com", Box::new(move |record| record.credit(30, at))).await.unwrap();

        // Another process sets limits between two flushes.
        let other = Domains::open(&ctx.path).unwrap();
        other
            .update("a.com", Box::new(|record| record.limits = Limits { daily: 600, weekly: 0 }))
            .await
            .unwrap();

        let record = ctx.domains.update("a.com", Box::new(move |record| record.credit(5, at))).await.unwrap();
        assert_eq!(record.total_time, 35);
        assert_eq!(record.limits.daily, 600);
    }

    #[test_context(DomainsTestContext)]
    #[tokio::test]
    async fn test_update_existing_skips_missing_records(ctx: &mut DomainsTestContext) {
        let at = Utc::now();
        let missing = ctx.domains.update_existing("gone.com", Box::new(move |record| record.credit(5, at))).await.unwrap();
        assert_eq!(missing, None);
        assert_eq!(ctx.domains.read("gone.com").await.unwrap(), None);

        ctx.domains.update("a.com", Box::new(move |record| record.credit(5, at))).await.unwrap();
        let record = ctx.domains.update_existing("a.com", Box::new(move |record| record.credit(2, at))).await.unwrap();
        assert_eq!(record.map(|record| record.total_time), Some(7));
    }

    #[test_context(DomainsTestContext)]
    #[tokio::test]
    async fn test_list_and_remove(ctx: &mut DomainsTestContext) {
        let record = DomainRecord {
            total_time: 7,
            ..Default::default()
        };
        ctx.domains.write("b.com", &record).await.unwrap();
        ctx.domains.write("a.com", &record).await.unwrap();

        let all = ctx.domains.list().await.unwrap();
        assert_eq!(all.keys().cloned().collect::<Vec<_>>(), vec!["a.com", "b.com"]);

        assert!(ctx.domains.remove("a.com").await.unwrap());
        assert!(!ctx.domains.remove("a.com").await.unwrap());
        assert_eq!(ctx.domains.list().await.unwrap().len(), 1);
    }

    #[test_context(DomainsTestContext)]
    #[tokio::test]
    async fn test_record_is_stored_as_camel_case_json(ctx: &mut DomainsTestContext) {
        let at = Utc::now();
        ctx.domains
            .update("a.com", Box::new(move |record| record.stamp_notification(Period::Weekly, at)))
            .await
            .unwrap();

        let conn = Connection::open(&ctx.path).unwrap();
        let json: String = conn
            .query_row("SELECT record FROM domains WHERE domain = 'a.com'", [], |row| row.get(0))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("dailyTime").is_some());
        assert!(value.get("totalTime").is_some());
        assert!(value["lastNotification"].get("weekly").is_some());
    }

    #[test_context(DomainsTestContext)]
    #[tokio::test]
    async fn test_corrupted_rows_are_skipped_in_list(ctx: &mut DomainsTestContext) {
        ctx.domains.write("good.com", &DomainRecord::default()).await.unwrap();

        let conn = Connection::open(&ctx.path).unwrap();
        conn.execute("INSERT INTO domains (domain, record) VALUES ('bad.com', 'not json')", []).unwrap();

        let all = ctx.domains.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("good.com"));
        assert!(ctx.domains.read("bad.com").await.is_err());
    }
}
