use super::{CleanupQueue, QueueError, QueuedRecord, RecordId};
use crate::clock::Clock;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ulid::Generator;
use uuid::Uuid;

/// Re-scan budget when the head disappears between scan and read.
const MAX_HEAD_ATTEMPTS: u32 = 16;

const RECORD_SUFFIX: &str = ".json";
const CORRUPT_SUFFIX: &str = ".corrupt";

/// Directory-backed FIFO queue
///
/// One JSON file per record, named `{ulid}.json`. ULIDs come from a
/// monotonic generator, so lexical order is enqueue order within one
/// process. Records pushed by different processes in the same millisecond
/// are ordered by ULID randomness, not by push time; `rsz process` and
/// `rsz clean-daemon` are such separate processes.
///
/// Destructive reads claim a record by renaming it to a hidden, uniquely
/// named file before reading it. Rename is atomic, so exactly one consumer
/// wins a given record even across processes.
///
/// A record file that does not parse is moved aside to `.{id}.corrupt` and
/// skipped, so it never blocks the records behind it.
pub struct FsQueue {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    ids: Mutex<Generator>,
}

impl fmt::Debug for FsQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsQueue")
            .field("dir", &self.dir)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl FsQueue {
    /// Open (creating if needed) a queue directory
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub async fn open(dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, QueueError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            clock,
            ids: Mutex::new(Generator::new()),
        })
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: RecordId) -> PathBuf {
        self.dir.join(format!("{id}{RECORD_SUFFIX}"))
    }

    fn next_id(&self) -> Result<RecordId, QueueError> {
        self.ids
            .lock()
            .generate()
            .map(RecordId)
            .map_err(|e| QueueError::IdAllocation(e.to_string()))
    }

    /// Ids of all visible records, oldest first
    async fn scan(&self) -> Result<Vec<RecordId>, QueueError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(RECORD_SUFFIX)) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            match stem.parse::<RecordId>() {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(file = stem, error = %e, "ignoring unrecognised queue file"),
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    async fn read_record(path: &Path, id: RecordId) -> Result<Option<QueuedRecord>, QueueError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| QueueError::Corrupt {
                id: id.to_string(),
                message: e.to_string(),
            })
    }

    /// Move an unparseable record file out of the queue
    async fn quarantine(&self, from: &Path, id: RecordId, reason: &str) -> Result<(), QueueError> {
        let dead = self.dir.join(format!(".{id}{CORRUPT_SUFFIX}"));
        match tokio::fs::rename(from, &dead).await {
            Ok(()) => {
                tracing::warn!(
                    record_id = %id,
                    moved_to = %dead.display(),
                    %reason,
                    "corrupt queue record moved aside"
                );
                Ok(())
            }
            // Another handle already moved it.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::error!(
                    record_id = %id,
                    from = %from.display(),
                    to = %dead.display(),
                    error = %e,
                    "cannot move corrupt queue record aside"
                );
                Err(e.into())
            }
        }
    }

    /// Read the head record, moving it aside if it is corrupt
    ///
    /// `Ok(None)` means the caller should re-scan.
    async fn read_head(&self, id: RecordId) -> Result<Option<QueuedRecord>, QueueError> {
        let path = self.record_path(id);
        match Self::read_record(&path, id).await {
            Err(QueueError::Corrupt { message, .. }) => {
                self.quarantine(&path, id, &message).await?;
                Ok(None)
            }
            other => other,
        }
    }

    /// Claim `id` by atomic rename, then read and discard the claim file
    ///
    /// A corrupt claim is moved aside rather than put back, and reported as
    /// `Ok(None)`.
    async fn claim(&self, id: RecordId) -> Result<Option<QueuedRecord>, QueueError> {
        let path = self.record_path(id);
        let claim = self.dir.join(format!(".{id}.{}.claim", Uuid::new_v4().simple()));

        match tokio::fs::rename(&path, &claim).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        match Self::read_record(&claim, id).await {
            Ok(record) => {
                tokio::fs::remove_file(&claim).await?;
                Ok(record)
            }
            Err(QueueError::Corrupt { message, .. }) => {
                self.quarantine(&claim, id, &message).await?;
                Ok(None)
            }
            Err(e) => {
                if let Err(restore) = tokio::fs::rename(&claim, &path).await {
                    tracing::error!(
                        record_id = %id,
                        claim = %claim.display(),
                        record = %path.display(),
                        error = %restore,
                        "claimed queue record could not be restored"
                    );
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl CleanupQueue for FsQueue {
    async fn push(&self, payload: String) -> Result<QueuedRecord, QueueError> {
        let record = QueuedRecord {
            id: self.next_id()?,
            payload,
            enqueued_at: self.clock.now(),
        };
        let json = serde_json::to_vec(&record).map_err(|e| QueueError::Corrupt {
            id: record.id.to_string(),
            message: e.to_string(),
        })?;

        let tmp = self.dir.join(format!(".{}.tmp", record.id));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, self.record_path(record.id)).await?;

        tracing::debug!(record_id = %record.id, "queue record written");
        Ok(record)
    }

    async fn peek(&self) -> Result<Option<QueuedRecord>, QueueError> {
        for _ in 0..MAX_HEAD_ATTEMPTS {
            let Some(&head) = self.scan().await?.first() else {
                return Ok(None);
            };
            if let Some(record) = self.read_head(head).await? {
                return Ok(Some(record));
            }
        }
        Err(QueueError::Contended {
            attempts: MAX_HEAD_ATTEMPTS,
        })
    }

    async fn pop(&self) -> Result<Option<QueuedRecord>, QueueError> {
        for _ in 0..MAX_HEAD_ATTEMPTS {
            let Some(&head) = self.scan().await?.first() else {
                return Ok(None);
            };
            if let Some(record) = self.claim(head).await? {
                return Ok(Some(record));
            }
        }
        Err(QueueError::Contended {
            attempts: MAX_HEAD_ATTEMPTS,
        })
    }

    async fn pop_if(&self, id: RecordId) -> Result<Option<QueuedRecord>, QueueError> {
        match self.scan().await?.first() {
            Some(&head) if head == id => self.claim(id).await,
            _ => Ok(None),
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.scan().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{DateTime, TimeDelta};

    async fn open(dir: &Path) -> (Arc<ManualClock>, FsQueue) {
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap()));
        let queue = FsQueue::open(dir, clock.clone()).await.unwrap();
        (clock, queue)
    }

    #[tokio::test]
    async fn fifo_order_and_stable_peek() {
        let dir = tempfile::tempdir().unwrap();
        let (_, q) = open(dir.path()).await;

        let a = q.push("a".into()).await.unwrap();
        let b = q.push("b".into()).await.unwrap();
        let c = q.push("c".into()).await.unwrap();

        assert_eq!(q.peek().await.unwrap(), Some(a.clone()));
        assert_eq!(q.peek().await.unwrap(), Some(a.clone()));
        assert_eq!(q.len().await.unwrap(), 3);

        assert_eq!(q.pop().await.unwrap(), Some(a));
        assert_eq!(q.pop().await.unwrap(), Some(b));
        assert_eq!(q.pop().await.unwrap(), Some(c));
        assert_eq!(q.pop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn records_survive_reopen_with_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, q) = open(dir.path()).await;
        let pushed = q.push("x,y".into()).await.unwrap();
        drop(q);

        clock.advance(TimeDelta::minutes(10));
        let reopened = FsQueue::open(dir.path(), clock.clone()).await.unwrap();
        let head = reopened.peek().await.unwrap().unwrap();
        assert_eq!(head, pushed);
        assert_eq!(head.age(clock.now()), TimeDelta::minutes(10));
    }

    #[tokio::test]
    async fn pop_if_is_exclusive_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, first) = open(dir.path()).await;
        let second = FsQueue::open(dir.path(), clock.clone()).await.unwrap();

        let record = first.push("a".into()).await.unwrap();
        let (x, y) = tokio::join!(first.pop_if(record.id), second.pop_if(record.id));
        let winners = [x.unwrap(), y.unwrap()].into_iter().flatten().count();
        assert_eq!(winners, 1);
        assert_eq!(first.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pop_if_ignores_non_head() {
        let dir = tempfile::tempdir().unwrap();
        let (_, q) = open(dir.path()).await;
        q.push("a".into()).await.unwrap();
        let b = q.push("b".into()).await.unwrap();

        assert_eq!(q.pop_if(b.id).await.unwrap(), None);
        assert_eq!(q.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn stray_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (_, q) = open(dir.path()).await;
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        std::fs::write(dir.path().join("not-a-ulid.json"), "{}").unwrap();

        assert_eq!(q.peek().await.unwrap(), None);
        let a = q.push("a".into()).await.unwrap();
        assert_eq!(q.peek().await.unwrap(), Some(a));
    }

    const LOWEST_ID: &str = "00000000000000000000000000";

    #[tokio::test]
    async fn corrupt_head_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let (_, q) = open(dir.path()).await;
        std::fs::write(dir.path().join(format!("{LOWEST_ID}.json")), "{\"id\":").unwrap();
        let a = q.push("a".into()).await.unwrap();

        assert_eq!(q.peek().await.unwrap(), Some(a.clone()));
        assert_eq!(q.len().await.unwrap(), 1);
        assert!(dir.path().join(format!(".{LOWEST_ID}.corrupt")).exists());
        assert!(!dir.path().join(format!("{LOWEST_ID}.json")).exists());

        assert_eq!(q.pop().await.unwrap(), Some(a));
        assert_eq!(q.pop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_record_file_does_not_block_pop() {
        let dir = tempfile::tempdir().unwrap();
        let (_, q) = open(dir.path()).await;
        std::fs::write(dir.path().join(format!("{LOWEST_ID}.json")), "").unwrap();
        let a = q.push("a".into()).await.unwrap();

        assert_eq!(q.pop().await.unwrap(), Some(a));
        assert_eq!(q.len().await.unwrap(), 0);
        assert!(dir.path().join(format!(".{LOWEST_ID}.corrupt")).exists());
    }

    #[tokio::test]
    async fn pop_if_on_corrupt_head_moves_it_aside() {
        let dir = tempfile::tempdir().unwrap();
        let (_, q) = open(dir.path()).await;
        std::fs::write(dir.path().join(format!("{LOWEST_ID}.json")), "not json").unwrap();
        let id: RecordId = LOWEST_ID.parse().unwrap();

        assert_eq!(q.pop_if(id).await.unwrap(), None);
        assert_eq!(q.len().await.unwrap(), 0);
        assert!(dir.path().join(format!(".{LOWEST_ID}.corrupt")).exists());

        // No claim file is left behind.
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".claim"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn debug_shows_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (_, q) = open(dir.path()).await;
        let shown = format!("{q:?}");
        assert!(shown.starts_with("FsQueue"));
        assert!(shown.contains(&dir.path().display().to_string()));
    }
}
