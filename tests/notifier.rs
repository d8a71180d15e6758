#[cfg(test)]
mod tests {
    use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
    use test_context::{test_context, TestContext};
    use timeup::libs::domain::{DomainRecord, Limits, Period};
    use timeup::libs::notifier::{LimitAlert, LimitNotifier};

    struct NotifierTestContext {
        notifier: LimitNotifier,
        record: DomainRecord,
        t0: DateTime<Utc>,
    }

    impl TestContext for NotifierTestContext {
        fn setup() -> Self {
            NotifierTestContext {
                notifier: LimitNotifier::new(TimeDelta::seconds(3600)),
                record: DomainRecord {
                    limits: Limits { daily: 600, weekly: 3000 },
                    ..Default::default()
                },
                t0: Local.with_ymd_and_hms(2025, 3, 19, 12, 0, 0).unwrap().with_timezone(&Utc),
            }
        }
    }

    impl NotifierTestContext {
        /// Evaluates the record and records every due alert as delivered.
        fn deliver(&mut self, domain: &str, now: DateTime<Utc>) -> Vec<LimitAlert> {
            let alerts = self.notifier.evaluate(domain, &self.record, now);
            for alert in &alerts {
                self.notifier.mark_sent(alert);
            }
            alerts
        }
    }

    #[test_context(NotifierTestContext)]
    #[test]
    fn test_limit_reached_exactly_is_not_exceeded(ctx: &mut NotifierTestContext) {
        ctx.record.credit(600, ctx.t0);
        assert!(ctx.deliver("x.com", ctx.t0).is_empty());
    }

    #[test_context(NotifierTestContext)]
    #[test]
    fn test_one_alert_per_cooldown(ctx: &mut NotifierTestContext) {
        ctx.record.credit(601, ctx.t0);
        let alerts = ctx.deliver("x.com", ctx.t0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].period, Period::Daily);
        assert_eq!(alerts[0].spent, 601);
        assert_eq!(alerts[0].limit, 600);
        assert!(alerts[0].id().starts_with("x.com-daily-"));
        assert!(alerts[0].body().contains("x.com"));

        let later = ctx.t0 + TimeDelta::seconds(10);
        ctx.record.credit(10, later);
        assert!(ctx.deliver("x.com", later).is_empty());

        // The cooldown is strict: exactly one hour later is still too soon.
        let hour = ctx.t0 + TimeDelta::seconds(3600);
        assert!(ctx.deliver("x.com", hour).is_empty());
        let after = hour + TimeDelta::seconds(1);
        assert_eq!(ctx.deliver("x.com", after).len(), 1);
    }

    #[test_context(NotifierTestContext)]
    #[test]
    fn test_periods_and_domains_throttle_independently(ctx: &mut NotifierTestContext) {
        ctx.record.credit(601, ctx.t0);
        assert_eq!(ctx.deliver("x.com", ctx.t0).len(), 1);

        let later = ctx.t0 + TimeDelta::seconds(60);
        ctx.record.credit(2400, later);
        let alerts = ctx.deliver("x.com", later);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].period, Period::Weekly);

        assert_eq!(ctx.deliver("y.com", later).len(), 2);
    }

    #[test_context(NotifierTestContext)]
    #[test]
    fn test_unset_limits_never_alert(ctx: &mut NotifierTestContext) {
        ctx.record.limits = Limits::default();
        ctx.record.credit(100_000, ctx.t0);
        assert!(ctx.deliver("x.com", ctx.t0).is_empty());
    }

    #[test_context(NotifierTestContext)]
    #[test]
    fn test_reset_clears_throttle(ctx: &mut NotifierTestContext) {
        ctx.record.credit(700, ctx.t0);
        assert_eq!(ctx.deliver("x.com", ctx.t0).len(), 1);
        ctx.notifier.reset();
        assert_eq!(ctx.deliver("x.com", ctx.t0).len(), 1);
    }

    #[test_context(NotifierTestContext)]
    #[test]
    fn test_undelivered_alert_stays_due(ctx: &mut NotifierTestContext) {
        ctx.record.credit(700, ctx.t0);
        assert_eq!(ctx.notifier.evaluate("x.com", &ctx.record, ctx.t0).len(), 1);

        let later = ctx.t0 + TimeDelta::seconds(5);
        let alerts = ctx.notifier.evaluate("x.com", &ctx.record, later);
        assert_eq!(alerts.len(), 1);

        ctx.notifier.mark_sent(&alerts[0]);
        assert!(ctx.notifier.evaluate("x.com", &ctx.record, later + TimeDelta::seconds(5)).is_empty());
    }
}
