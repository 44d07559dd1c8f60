//! Cleanup record writer
//!
//! One pipeline run, one queue entry. Never batches across runs.

use crate::error::WriterError;
use rsz_artifact::CleanupRecord;
use rsz_store::{CleanupQueue, QueuedRecord};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CleanupRecordWriter {
    queue: Arc<dyn CleanupQueue>,
}

impl CleanupRecordWriter {
    #[inline]
    #[must_use]
    pub fn new(queue: Arc<dyn CleanupQueue>) -> Self {
        Self { queue }
    }

    /// Serialize `names` into a single record and push it
    ///
    /// # Errors
    /// - [`WriterError::Record`] if a name cannot be carried in a record
    /// - [`WriterError::QueueUnavailable`] if the push fails
    pub async fn enqueue(&self, names: &[String]) -> Result<QueuedRecord, WriterError> {
        let record = CleanupRecord::new(names.to_vec())?;
        let queued = self
            .queue
            .push(record.to_payload())
            .await
            .map_err(WriterError::QueueUnavailable)?;

        tracing::info!(
            record_id = %queued.id,
            names = record.len(),
            "cleanup record enqueued"
        );
        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsz_store::{MemoryQueue, SystemClock};
    use rsz_test_utils::UnavailableQueue;

    #[tokio::test]
    async fn one_call_one_record() {
        let queue = Arc::new(MemoryQueue::new(Arc::new(SystemClock)));
        let writer = CleanupRecordWriter::new(queue.clone());

        writer.enqueue(&["a".into(), "b".into()]).await.unwrap();
        writer.enqueue(&["c".into()]).await.unwrap();

        let payloads: Vec<_> = queue.snapshot().into_iter().map(|r| r.payload).collect();
        assert_eq!(payloads, vec!["a,b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn invalid_name_never_reaches_queue() {
        let queue = Arc::new(MemoryQueue::new(Arc::new(SystemClock)));
        let writer = CleanupRecordWriter::new(queue.clone());

        let err = writer.enqueue(&["a,b".into()]).await.unwrap_err();
        assert!(matches!(err, WriterError::Record(_)));
        assert!(queue.snapshot().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_queue_unavailable() {
        let writer = CleanupRecordWriter::new(Arc::new(UnavailableQueue::default()));
        let err = writer.enqueue(&["a".into()]).await.unwrap_err();
        assert!(matches!(err, WriterError::QueueUnavailable(_)));
    }
}
