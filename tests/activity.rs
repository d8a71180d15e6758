#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use test_context::{test_context, AsyncTestContext};
    use timeup::libs::activity::{ActivityProbe, ActivitySample, HostSignals, HostState, ProbeError, SignalSource, TabId, TabReport};

    const DEADLINE: Duration = Duration::from_millis(50);

    /// Page and host that never answer.
    struct Unresponsive;

    #[async_trait]
    impl ActivityProbe for Unresponsive {
        async fn check_activity(&self, _tab: TabId) -> Result<ActivitySample, ProbeError> {
            std::future::pending().await
        }
    }

    #[async_trait]
    impl HostSignals for Unresponsive {
        async fn query_state(&self, _idle_after: Duration) -> HostState {
            std::future::pending().await
        }

        async fn active_tab(&self) -> Option<TabId> {
            std::future::pending().await
        }
    }

    struct ActivityTestContext {
        signals: SignalSource,
    }

    impl AsyncTestContext for ActivityTestContext {
        async fn setup() -> Self {
            let silent = Arc::new(Unresponsive);
            ActivityTestContext {
                signals: SignalSource::new(silent.clone(), silent, DEADLINE),
            }
        }
    }

    #[test_context(ActivityTestContext)]
    #[tokio::test]
    async fn test_silent_page_yields_no_sample_within_deadline(ctx: &mut ActivityTestContext) {
        let started = Instant::now();
        let sample = tokio::time::timeout(Duration::from_secs(2), ctx.signals.sample(TabId(1))).await;
        assert_eq!(sample, Ok(None));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test_context(ActivityTestContext)]
    #[tokio::test]
    async fn test_silent_host_reads_as_active_and_unknown_tab(ctx: &mut ActivityTestContext) {
        let started = Instant::now();
        let observation = tokio::time::timeout(Duration::from_secs(2), ctx.signals.observe(TabId(1), true, Duration::from_secs(60)))
            .await
            .unwrap();

        assert_eq!(observation.sample, None);
        assert_eq!(observation.host, HostState::Active);
        assert_eq!(observation.active_tab, TabReport::Unknown);
        // The three queries share one deadline instead of stacking.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test_context(ActivityTestContext)]
    #[tokio::test]
    async fn test_unfocused_window_skips_the_page(ctx: &mut ActivityTestContext) {
        let observation = ctx.signals.observe(TabId(3), false, Duration::from_secs(60)).await;
        assert_eq!(observation.tab, TabId(3));
        assert_eq!(observation.sample, None);
        assert!(!observation.window_focused);
    }
}
