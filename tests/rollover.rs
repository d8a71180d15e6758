#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};
    use std::collections::BTreeMap;
    use test_context::{test_context, AsyncTestContext};
    use timeup::commands::reset::{reset_all, reset_period};
    use timeup::db::{memory::MemoryDomains, DomainStore, RecordEdit};
    use timeup::libs::domain::{DomainRecord, Limits, Period, DATE_KEY_FORMAT};
    use timeup::libs::rollover::{prune_days, prune_weeks};

    struct RolloverTestContext {
        store: MemoryDomains,
        today: NaiveDate,
    }

    impl AsyncTestContext for RolloverTestContext {
        async fn setup() -> Self {
            RolloverTestContext {
                store: MemoryDomains::new(),
                // A Wednesday.
                today: NaiveDate::from_ymd_opt(2025, 3, 19).unwrap(),
            }
        }
    }

    /// Memory store where `gone.com` is deleted right after every listing,
    /// as a concurrent `remove` would.
    #[derive(Default)]
    struct RacingRemoveStore {
        inner: MemoryDomains,
    }

    #[async_trait]
    impl DomainStore for RacingRemoveStore {
        async fn read(&self, domain: &str) -> Result<Option<DomainRecord>> {
            self.inner.read(domain).await
        }

        async fn write(&self, domain: &str, record: &DomainRecord) -> Result<()> {
            self.inner.write(domain, record).await
        }

        async fn update(&self, domain: &str, edit: RecordEdit) -> Result<DomainRecord> {
            self.inner.update(domain, edit).await
        }

        async fn update_existing(&self, domain: &str, edit: RecordEdit) -> Result<Option<DomainRecord>> {
            self.inner.update_existing(domain, edit).await
        }

        async fn list(&self) -> Result<BTreeMap<String, DomainRecord>> {
            let records = self.inner.list().await?;
            self.inner.remove("gone.com").await?;
            Ok(records)
        }

        async fn remove(&self, domain: &str) -> Result<bool> {
            self.inner.remove(domain).await
        }
    }

    fn key(date: NaiveDate) -> String {
        date.format(DATE_KEY_FORMAT).to_string()
    }

    #[test_context(RolloverTestContext)]
    #[tokio::test]
    async fn test_daily_rollover_drops_old_days_only(ctx: &mut RolloverTestContext) {
        let mut record = DomainRecord {
            total_time: 100,
            ..Default::default()
        };
        for offset in [0, 3, 7, 8, 20] {
            record.daily_time.insert(key(ctx.today - Duration::days(offset)), 20);
        }
        record.weekly_time.insert(key(ctx.today - Duration::weeks(10)), 100);
        ctx.store.write("a.com", &record).await.unwrap();
        ctx.store.write("b.com", &DomainRecord::default()).await.unwrap();

        assert_eq!(prune_days(&ctx.store, ctx.today).await.unwrap(), 2);

        let record = ctx.store.read("a.com").await.unwrap().unwrap();
        assert_eq!(record.daily_time.len(), 3);
        assert_eq!(record.weekly_time.len(), 1);
        assert_eq!(record.total_time, 100);
    }

    #[test_context(RolloverTestContext)]
    #[tokio::test]
    async fn test_weekly_rollover_keeps_four_weeks(ctx: &mut RolloverTestContext) {
        let monday = ctx.today - Duration::days(2);
        let mut record = DomainRecord::default();
        for weeks in [0, 1, 4, 5, 12] {
            record.weekly_time.insert(key(monday - Duration::weeks(weeks)), 60);
        }
        ctx.store.write("a.com", &record).await.unwrap();

        assert_eq!(prune_weeks(&ctx.store, ctx.today).await.unwrap(), 2);
        let record = ctx.store.read("a.com").await.unwrap().unwrap();
        assert_eq!(record.weekly_time.len(), 3);
    }

    #[test_context(RolloverTestContext)]
    #[tokio::test]
    async fn test_reset_period_keeps_totals_and_limits(ctx: &mut RolloverTestContext) {
        let now = Local.with_ymd_and_hms(2025, 3, 19, 12, 0, 0).unwrap().with_timezone(&Utc);
        let mut record = DomainRecord {
            limits: Limits { daily: 60, weekly: 600 },
            ..Default::default()
        };
        record.credit(90, now);
        ctx.store.write("a.com", &record).await.unwrap();

        reset_period(&ctx.store, Period::Daily).await.unwrap();
        // The reset targets the real current day; only assert what it cannot touch.
        let record = ctx.store.read("a.com").await.unwrap().unwrap();
        assert_eq!(record.total_time, 90);
        assert_eq!(record.limits, Limits { daily: 60, weekly: 600 });

        reset_all(&ctx.store).await.unwrap();
        assert!(ctx.store.list().await.unwrap().is_empty());
    }

    #[test_context(RolloverTestContext)]
    #[tokio::test]
    async fn test_removed_records_are_not_recreated(ctx: &mut RolloverTestContext) {
        let store = RacingRemoveStore::default();
        let mut record = DomainRecord::default();
        record.daily_time.insert(key(ctx.today - Duration::days(30)), 20);

        for domain in ["gone.com", "kept.com"] {
            store.write(domain, &record).await.unwrap();
        }
        assert_eq!(prune_days(&store, ctx.today).await.unwrap(), 1);
        assert_eq!(store.read("gone.com").await.unwrap(), None);
        assert!(store.read("kept.com").await.unwrap().unwrap().daily_time.is_empty());

        store.write("gone.com", &record).await.unwrap();
        reset_period(&store, Period::Weekly).await.unwrap();
        assert_eq!(store.read("gone.com").await.unwrap(), None);
        assert!(store.read("kept.com").await.unwrap().is_some());
    }
}
