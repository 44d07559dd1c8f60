//! Periodic trigger for the consumer

use crate::consumer::CleanupConsumer;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Default trigger period
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Runs [`CleanupConsumer::run_once`] every `interval`
///
/// The first run happens immediately. Runs are sequential; a run that
/// overshoots its period swallows the missed ticks instead of bursting.
#[derive(Debug, Clone)]
pub struct CleanupSchedule {
    consumer: Arc<CleanupConsumer>,
    interval: Duration,
}

impl CleanupSchedule {
    #[must_use]
    pub fn new(consumer: Arc<CleanupConsumer>, interval: Duration) -> Self {
        Self {
            consumer,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Loop until `shutdown` resolves; returns how many runs completed
    ///
    /// Shutdown is only observed between runs.
    pub async fn run<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(interval_secs = self.interval.as_secs(), "cleanup schedule started");
        let mut runs = 0;
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    let report = self.consumer.run_once().await;
                    runs += 1;
                    tracing::info!(run = runs, summary = %report.summary(), "cleanup run finished");
                }
            }
        }
        tracing::info!(runs, "cleanup schedule stopped");
        runs
    }
}
