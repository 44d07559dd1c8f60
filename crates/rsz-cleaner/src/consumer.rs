//! Age-gated drain of the cleanup queue
//!
//! Each invocation looks at the head record only. If it is old enough it is
//! claimed with a compare-and-remove and every name in it is deleted
//! independently; otherwise it is left exactly where it was.

use crate::report::{DeleteFailure, DeleteFailureReason, DeletionReport, DrainOutcome};
use chrono::TimeDelta;
use rsz_artifact::CleanupRecord;
use rsz_store::{CleanupQueue, Clock, ObjectStore, QueuedRecord};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default retention before derivatives may be deleted
pub const DEFAULT_RETENTION_MINUTES: u32 = 60;

/// Minimum age a record must reach before it is drained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    threshold: TimeDelta,
}

impl RetentionPolicy {
    #[inline]
    #[must_use]
    pub fn new(threshold: TimeDelta) -> Self {
        Self { threshold }
    }

    #[inline]
    #[must_use]
    pub fn from_minutes(minutes: u32) -> Self {
        Self::new(TimeDelta::minutes(i64::from(minutes)))
    }

    #[inline]
    #[must_use]
    pub fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    /// Inclusive: a record exactly `threshold` old is eligible
    #[inline]
    #[must_use]
    pub fn admits(&self, age: TimeDelta) -> bool {
        age >= self.threshold
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_RETENTION_MINUTES)
    }
}

/// Single-head queue consumer
///
/// `run_once` holds an internal lock for its whole duration, so overlapping
/// calls on one consumer run one after the other. Separate consumers on the
/// same queue are kept apart by [`CleanupQueue::pop_if`].
#[derive(Debug)]
pub struct CleanupConsumer {
    queue: Arc<dyn CleanupQueue>,
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    retention: RetentionPolicy,
    drain_lock: Mutex<()>,
}

impl CleanupConsumer {
    #[must_use]
    pub fn new(
        queue: Arc<dyn CleanupQueue>,
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            queue,
            store,
            clock,
            retention,
            drain_lock: Mutex::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Examine the head record and drain it if it is old enough
    ///
    /// Never fails; queue and store errors are folded into the report.
    pub async fn run_once(&self) -> DeletionReport {
        let _guard = self.drain_lock.lock().await;

        let head = match self.queue.peek().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("cleanup queue empty");
                return DeletionReport::without_deletes(DrainOutcome::Idle, None);
            }
            Err(e) => {
                tracing::warn!(error = %e, "cleanup queue peek failed");
                return DeletionReport::without_deletes(
                    DrainOutcome::QueueUnavailable {
                        reason: e.to_string(),
                    },
                    None,
                );
            }
        };

        let age = head.age(self.clock.now());
        if !self.retention.admits(age) {
            let remaining = self.retention.threshold() - age;
            tracing::debug!(
                record_id = %head.id,
                age_secs = age.num_seconds(),
                remaining_secs = remaining.num_seconds(),
                "head record not old enough"
            );
            return DeletionReport::without_deletes(
                DrainOutcome::TooYoung { age, remaining },
                Some(head.id),
            );
        }

        match self.queue.pop_if(head.id).await {
            Ok(Some(record)) => self.drain(record).await,
            Ok(None) => {
                tracing::info!(record_id = %head.id, "head record claimed by another consumer");
                DeletionReport::without_deletes(DrainOutcome::Preempted, Some(head.id))
            }
            Err(e) => {
                tracing::warn!(record_id = %head.id, error = %e, "cleanup queue pop failed");
                DeletionReport::without_deletes(
                    DrainOutcome::QueueUnavailable {
                        reason: e.to_string(),
                    },
                    Some(head.id),
                )
            }
        }
    }

    async fn drain(&self, record: QueuedRecord) -> DeletionReport {
        let names = CleanupRecord::parse(&record.payload).into_names();
        let attempted = names.len();
        let mut deleted = Vec::with_capacity(attempted);
        let mut failures = Vec::new();

        for name in names {
            let reason = match self.store.delete(&name).await {
                Ok(true) => {
                    tracing::debug!(record_id = %record.id, object = %name, "derivative deleted");
                    deleted.push(name);
                    continue;
                }
                Ok(false) => DeleteFailureReason::Missing,
                Err(e) => DeleteFailureReason::Store(e.to_string()),
            };
            tracing::warn!(record_id = %record.id, object = %name, ?reason, "derivative not deleted");
            failures.push(DeleteFailure { name, reason });
        }

        tracing::info!(
            record_id = %record.id,
            attempted,
            deleted = deleted.len(),
            failed = failures.len(),
            "cleanup record drained"
        );

        DeletionReport {
            outcome: DrainOutcome::Drained,
            record_id: Some(record.id),
            attempted,
            deleted,
            failures,
        }
    }
}
