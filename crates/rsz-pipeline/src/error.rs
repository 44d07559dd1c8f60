//! Error types for the pipeline
//!
//! Fatal to a run: [`PipelineError`]. Everything per-derivative is folded
//! into [`crate::DerivativeFailure`] instead.

use image::ImageFormat;
use rsz_artifact::RecordError;
use rsz_store::{QueueError, StoreError};

/// Errors that end a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Upload refused before any work
    #[error("upload rejected: {0}")]
    Rejected(#[from] UploadRejection),

    /// Source bytes are not a decodable image; nothing was uploaded
    #[error("source is not a decodable image: {0}")]
    Decode(#[source] TranscodeError),

    /// Raw source could not be stored; nothing to derive from
    #[error("source upload failed for '{name}': {source}")]
    SourceUpload {
        name: String,
        #[source]
        source: StoreError,
    },

    /// Blocking worker panicked or was cancelled
    #[error("image worker failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Whether the caller sent something unusable (as opposed to a backend fault)
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Decode(_))
    }
}

/// Upload policy violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("upload is empty")]
    Empty,

    #[error("upload is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("declared content type '{0}' is not an image")]
    NotAnImage(String),
}

/// Decode / resize / encode failures
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    /// Format could not be determined from the bytes
    #[error("unrecognised image format: {0}")]
    UnknownFormat(#[source] image::ImageError),

    #[error("failed to decode {format:?} image: {source}")]
    Decode {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode {format:?} image: {source}")]
    Encode {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },
}

/// Cleanup record writer errors
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// Names cannot form a valid record
    #[error("invalid cleanup record: {0}")]
    Record(#[from] RecordError),

    /// Transport refused the write
    #[error("cleanup queue unavailable: {0}")]
    QueueUnavailable(#[source] QueueError),
}
