//! Resizer Cleaner
//!
//! Deletes derivatives once their cleanup record has aged past the retention
//! threshold.
//!
//! # Core Concepts
//!
//! - **Head-only**: each invocation examines the oldest record and nothing
//!   else, so records are drained strictly in enqueue order
//! - **Age gate**: a record younger than the threshold is left in place and
//!   is seen again by the next invocation
//! - **Claim before delete**: the record is removed with a compare-and-remove
//!   before any object is touched, so two consumers never drain it twice
//! - **Best effort**: one failed delete never stops the others
//!
//! # Example
//!
//! ```rust,ignore
//! use rsz_cleaner::{CleanupConsumer, CleanupSchedule, RetentionPolicy};
//!
//! let consumer = Arc::new(CleanupConsumer::new(queue, store, clock, RetentionPolicy::default()));
//! let report = consumer.run_once().await;
//! println!("{}", report.summary());
//!
//! CleanupSchedule::new(consumer, DEFAULT_INTERVAL)
//!     .run(async { tokio::signal::ctrl_c().await.ok(); })
//!     .await;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod consumer;
pub mod report;
pub mod schedule;

pub use consumer::{CleanupConsumer, RetentionPolicy, DEFAULT_RETENTION_MINUTES};
pub use report::{DeleteFailure, DeleteFailureReason, DeletionReport, DrainOutcome};
pub use schedule::{CleanupSchedule, DEFAULT_INTERVAL};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
