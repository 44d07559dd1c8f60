//! Resizer Storage Capabilities
//!
//! The two shared mutable resources of the system, behind async traits:
//!
//! - [`ObjectStore`]: flat-named blob container (`put` / `get` / `delete`)
//! - [`CleanupQueue`]: FIFO of timestamped string payloads with a
//!   non-destructive `peek` and an exclusive compare-and-remove `pop_if`
//!
//! plus the [`Clock`] that stamps queue records. Each capability has an
//! in-memory backend (tests, single-process use) and a filesystem backend.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod clock;
pub mod object;
pub mod queue;

pub use clock::{Clock, ManualClock, SystemClock};
pub use object::{
    validate_object_name, FsObjectStore, Locator, MemoryObjectStore, ObjectStore, StoreError,
};
pub use queue::{CleanupQueue, FsQueue, MemoryQueue, QueueError, QueuedRecord, RecordId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
