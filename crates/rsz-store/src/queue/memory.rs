use super::{CleanupQueue, QueueError, QueuedRecord, RecordId};
use crate::clock::Clock;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// In-process FIFO queue
///
/// Every operation runs under one lock, so `pop_if` is trivially a
/// compare-and-remove on the head.
#[derive(Debug)]
pub struct MemoryQueue {
    records: Mutex<VecDeque<QueuedRecord>>,
    clock: Arc<dyn Clock>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            clock,
        }
    }

    /// Snapshot of all queued records, head first
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueuedRecord> {
        self.records.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl CleanupQueue for MemoryQueue {
    async fn push(&self, payload: String) -> Result<QueuedRecord, QueueError> {
        let record = QueuedRecord {
            id: RecordId::new(),
            payload,
            enqueued_at: self.clock.now(),
        };
        self.records.lock().push_back(record.clone());
        Ok(record)
    }

    async fn peek(&self) -> Result<Option<QueuedRecord>, QueueError> {
        Ok(self.records.lock().front().cloned())
    }

    async fn pop(&self) -> Result<Option<QueuedRecord>, QueueError> {
        Ok(self.records.lock().pop_front())
    }

    async fn pop_if(&self, id: RecordId) -> Result<Option<QueuedRecord>, QueueError> {
        let mut records = self.records.lock();
        match records.front() {
            Some(head) if head.id == id => Ok(records.pop_front()),
            _ => Ok(None),
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.records.lock().len())
    }
}
