//! Cleanup queue capability
//!
//! A FIFO of string payloads. The queue stamps each record with its own
//! clock at `push`; consumers read that stamp to age-gate deletion.
//!
//! # Destructive reads
//! `pop` removes whatever is at the head. `pop_if` removes the head only if
//! it is still the record the caller peeked, and is exclusive: of any number
//! of concurrent `pop_if(id)` calls, at most one returns the record.

mod fs;
mod memory;

pub use fs::FsQueue;
pub use memory::MemoryQueue;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use ulid::Ulid;

/// Queue errors
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Backend IO failure
    #[error("queue io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record could not be decoded
    #[error("corrupt queue record {id}: {message}")]
    Corrupt { id: String, message: String },

    /// Could not allocate an ordered record id
    #[error("record id allocation failed: {0}")]
    IdAllocation(String),

    /// Head kept moving under concurrent consumers
    #[error("queue head contended after {attempts} attempts")]
    Contended { attempts: u32 },

    /// Transport refused the operation
    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// Queue-assigned record identifier (ULID, sortable in enqueue order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Ulid);

impl RecordId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// A record as stored by the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRecord {
    pub id: RecordId,
    pub payload: String,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedRecord {
    /// Age relative to `now` (negative if the record is from the future)
    #[inline]
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.enqueued_at
    }
}

/// FIFO queue of cleanup payloads
#[async_trait]
pub trait CleanupQueue: Send + Sync + Debug {
    /// Append a payload; the queue assigns id and timestamp
    async fn push(&self, payload: String) -> Result<QueuedRecord, QueueError>;

    /// Current head without removing it
    async fn peek(&self) -> Result<Option<QueuedRecord>, QueueError>;

    /// Remove and return the current head
    async fn pop(&self) -> Result<Option<QueuedRecord>, QueueError>;

    /// Remove and return the head only if its id is `id`
    ///
    /// Returns `Ok(None)` if that record was already consumed or is no
    /// longer at the head.
    async fn pop_if(&self, id: RecordId) -> Result<Option<QueuedRecord>, QueueError>;

    async fn len(&self) -> Result<usize, QueueError>;
}
