//! What one consumer invocation did

use chrono::TimeDelta;
use rsz_store::RecordId;
use serde::{Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_secs<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(delta.num_seconds())
}

/// Terminal state of [`crate::CleanupConsumer::run_once`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrainOutcome {
    /// Queue empty
    Idle,
    /// Head is younger than the retention threshold and was left in place
    TooYoung {
        #[serde(rename = "age_secs", serialize_with = "as_secs")]
        age: TimeDelta,
        #[serde(rename = "remaining_secs", serialize_with = "as_secs")]
        remaining: TimeDelta,
    },
    /// Head was claimed and its names were processed
    Drained,
    /// Another consumer claimed the head between peek and pop
    Preempted,
    /// Peek or pop failed
    QueueUnavailable { reason: String },
}

impl Display for DrainOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::TooYoung { age, remaining } => write!(
                f,
                "too young (age {}s, {}s remaining)",
                age.num_seconds(),
                remaining.num_seconds()
            ),
            Self::Drained => f.write_str("drained"),
            Self::Preempted => f.write_str("preempted"),
            Self::QueueUnavailable { reason } => write!(f, "queue unavailable: {reason}"),
        }
    }
}

/// Why one name was not deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DeleteFailureReason {
    /// Object did not exist
    Missing,
    /// Store refused or failed the delete
    Store(String),
}

/// One name from a drained record that could not be deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub name: String,
    pub reason: DeleteFailureReason,
}

/// Report for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub outcome: DrainOutcome,
    /// Head record examined, if any
    pub record_id: Option<RecordId>,
    pub attempted: usize,
    pub deleted: Vec<String>,
    pub failures: Vec<DeleteFailure>,
}

impl DeletionReport {
    pub(crate) fn without_deletes(outcome: DrainOutcome, record_id: Option<RecordId>) -> Self {
        Self {
            outcome,
            record_id,
            attempted: 0,
            deleted: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True unless a record was drained with at least one name in it
    #[inline]
    #[must_use]
    pub fn nothing_to_delete(&self) -> bool {
        !(self.outcome == DrainOutcome::Drained && self.attempted > 0)
    }

    /// One-line human summary
    #[must_use]
    pub fn summary(&self) -> String {
        match (&self.outcome, self.record_id) {
            (DrainOutcome::Drained, Some(id)) => format!(
                "drained record {id}: {} attempted, {} deleted, {} failed",
                self.attempted,
                self.deleted.len(),
                self.failures.len()
            ),
            (outcome, Some(id)) => format!("record {id}: {outcome}"),
            (outcome, None) => outcome.to_string(),
        }
    }
}
