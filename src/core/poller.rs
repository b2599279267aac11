use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use crate::config::PollingSettings;
use crate::core::pool::{DispatchPool, ResultStream};
use crate::core::shutdown::ShutdownSignal;
use crate::services::{MetricsSink, SwipeApi};

/// Largest batch the service accepts per fetch.
pub const MAX_BATCH_SIZE: usize = 100;

/// Periodically pulls a batch of candidates and feeds it to the pool
pub struct Poller {
    api: Arc<dyn SwipeApi>,
    metrics: Arc<dyn MetricsSink>,
    interval: Duration,
    batch_size: usize,
}

impl Poller {
    pub fn new(
        api: Arc<dyn SwipeApi>,
        metrics: Arc<dyn MetricsSink>,
        settings: &PollingSettings,
    ) -> Self {
        Self {
            api,
            metrics,
            interval: settings.interval().max(Duration::from_millis(1)),
            batch_size: settings.batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Tick until `shutdown` fires. Fetch failures are logged and retried on the next tick.
    pub async fn run(&self, pool: &DispatchPool, shutdown: ShutdownSignal) {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.poll_once(pool, &shutdown).await;
        }

        tracing::info!("Polling loop stopped");
    }

    /// Fetch one batch and enqueue it; returns how many candidates were admitted.
    pub async fn poll_once(&self, pool: &DispatchPool, shutdown: &ShutdownSignal) -> usize {
        let started = Instant::now();
        let fetched = self.api.fetch_candidates(self.batch_size, shutdown).await;
        self.metrics.observe_latency(started.elapsed().as_secs_f64());

        let candidates = match fetched {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch candidates");
                return 0;
            }
        };

        if candidates.is_empty() {
            tracing::info!("No candidates; waiting");
            return 0;
        }

        let fetched = candidates.len();
        let report = pool.enqueue_many(candidates);
        tracing::debug!(fetched, accepted = report.accepted, dropped = report.dropped.len(), "Batch enqueued");
        report.accepted
    }
}

/// Drain the result stream, logging every outcome. Returns once the stream closes.
pub async fn log_results(mut results: ResultStream) -> usize {
    let mut seen = 0;
    while let Some(outcome) = results.recv().await {
        seen += 1;
        match &outcome.error {
            None => tracing::info!(
                candidate_id = %outcome.candidate_id,
                action = %outcome.action,
                matched = outcome.matched,
                processed_at = %outcome.processed_at,
                "Swipe submitted"
            ),
            Some(e) => tracing::warn!(
                candidate_id = %outcome.candidate_id,
                action = %outcome.action,
                processed_at = %outcome.processed_at,
                error = %e,
                "Swipe failed"
            ),
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolSettings;
    use crate::core::decide::RuleDecider;
    use crate::core::shutdown;
    use crate::models::{Action, Candidate, SwipeResponse};
    use crate::services::{ApiError, NoopMetrics};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails every other fetch, returns `limit` candidates otherwise.
    #[derive(Default)]
    struct FlakySource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl SwipeApi for FlakySource {
        async fn fetch_candidates(
            &self,
            limit: usize,
            _shutdown: &ShutdownSignal,
        ) -> Result<Vec<Candidate>, ApiError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 1 {
                return Err(ApiError::ServerError { status: 503, attempts: 4 });
            }
            Ok((0..limit)
                .map(|i| Candidate {
                    id: format!("{}-{}", n, i),
                    name: "Eli Martin".to_string(),
                    age: 30,
                    interests: vec![],
                })
                .collect())
        }

        async fn submit_swipe(
            &self,
            _candidate_id: &str,
            _action: Action,
            _shutdown: &ShutdownSignal,
        ) -> Result<SwipeResponse, ApiError> {
            Ok(SwipeResponse { matched: false, message: "ok".to_string() })
        }
    }

    fn idle_pool(api: Arc<dyn SwipeApi>) -> DispatchPool {
        DispatchPool::new(
            api,
            Arc::new(RuleDecider::default()),
            Arc::new(NoopMetrics),
            PoolSettings { queue_capacity: 64, ..PoolSettings::default() },
        )
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let api: Arc<dyn SwipeApi> = Arc::new(FlakySource::default());
        let settings = PollingSettings { interval_secs: 1, batch_size: 500 };
        assert_eq!(Poller::new(Arc::clone(&api), Arc::new(NoopMetrics), &settings).batch_size(), 100);

        let settings = PollingSettings { interval_secs: 1, batch_size: 0 };
        assert_eq!(Poller::new(api, Arc::new(NoopMetrics), &settings).batch_size(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_fatal() {
        let api: Arc<dyn SwipeApi> = Arc::new(FlakySource::default());
        let pool = idle_pool(Arc::clone(&api));
        let settings = PollingSettings { interval_secs: 1, batch_size: 5 };
        let poller = Poller::new(api, Arc::new(NoopMetrics), &settings);
        let signal = ShutdownSignal::never();

        assert_eq!(poller.poll_once(&pool, &signal).await, 5);
        assert_eq!(poller.poll_once(&pool, &signal).await, 0);
        assert_eq!(poller.poll_once(&pool, &signal).await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_on_shutdown() {
        let source = Arc::new(FlakySource::default());
        let api: Arc<dyn SwipeApi> = source.clone();
        let pool = idle_pool(Arc::clone(&api));
        let settings = PollingSettings { interval_secs: 2, batch_size: 3 };
        let poller = Poller::new(api, Arc::new(NoopMetrics), &settings);
        let (trigger, signal) = shutdown::channel();

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });
        poller.run(&pool, signal).await;
        stopper.await.unwrap();

        // First tick is one interval in: fetches at 2s and 4s only.
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_log_results_counts_until_closed() {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tx.send(crate::models::SwipeOutcome::success("a".into(), Action::Like, true, "it's a match!".into()))
            .await
            .unwrap();
        tx.send(crate::models::SwipeOutcome::failure("b".into(), Action::Pass, ApiError::Cancelled))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(log_results(rx).await, 2);
    }
}
