//! Result of one pipeline run

use rsz_artifact::{DerivativeArtifact, EncodingKind, Orientation, ResolutionEntry};
use rsz_store::RecordId;
use serde::Serialize;
use url::Url;

/// Where a per-entry failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transcode,
    Upload,
}

/// One catalog entry that produced no derivative
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivativeFailure {
    /// Position in the catalog
    pub index: usize,
    /// Oriented target size
    pub size: ResolutionEntry,
    pub kind: FailureKind,
    pub reason: String,
}

/// What happened to the run's cleanup record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupStatus {
    Enqueued { record_id: RecordId },
    /// Zero derivatives, so no record was written
    NothingToClean,
    /// Queue refused the record; the derivatives are leaked
    Failed { reason: String },
}

/// The stored source object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub locator: Url,
}

/// Outcome of a successful (possibly partial) run
///
/// `derivatives` is in catalog order restricted to successes.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub source: SourceSummary,
    pub encoding: EncodingKind,
    pub orientation: Orientation,
    pub derivatives: Vec<DerivativeArtifact>,
    pub failures: Vec<DerivativeFailure>,
    pub cleanup: CleanupStatus,
}

impl ProcessOutcome {
    /// Derivative locators, index-aligned with [`Self::cleanup_names`]
    #[must_use]
    pub fn locators(&self) -> Vec<Url> {
        self.derivatives.iter().map(|d| d.locator.clone()).collect()
    }

    /// Derivative names, index-aligned with [`Self::locators`]
    #[must_use]
    pub fn cleanup_names(&self) -> Vec<String> {
        self.derivatives.iter().map(|d| d.name.clone()).collect()
    }

    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
