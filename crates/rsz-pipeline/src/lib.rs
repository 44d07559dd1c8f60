//! Resizer Pipeline
//!
//! Turns one uploaded image into the full catalog of derivatives:
//!
//! 1. [`UploadPolicy`] gate (size, declared MIME type)
//! 2. decode once ([`Transcoder::decode`])
//! 3. upload the raw source
//! 4. per catalog entry: orient, resize, encode, upload
//! 5. one cleanup record for the run via [`CleanupRecordWriter`]
//!
//! Per-entry failures are recorded in the [`ProcessOutcome`] and skipped;
//! only policy rejection, decode failure and source upload failure end a
//! run with an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use rsz_pipeline::{FanOutPipeline, PipelineConfig};
//!
//! let pipeline = FanOutPipeline::new(store, writer, PipelineConfig::default());
//! let outcome = pipeline
//!     .process(bytes, "image/png", EncodingKind::Webp, Orientation::Portrait)
//!     .await?;
//! for url in outcome.locators() {
//!     println!("{url}");
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod transcoder;
pub mod upload;
pub mod writer;

pub use error::{PipelineError, TranscodeError, UploadRejection, WriterError};
pub use outcome::{CleanupStatus, DerivativeFailure, FailureKind, ProcessOutcome, SourceSummary};
pub use pipeline::{FanOutPipeline, PipelineConfig};
pub use transcoder::{DecodedImage, Transcoder, TranscoderConfig};
pub use upload::UploadPolicy;
pub use writer::CleanupRecordWriter;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
