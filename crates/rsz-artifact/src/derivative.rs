//! Uploaded derivative descriptor

use crate::catalog::ResolutionEntry;
use serde::{Deserialize, Serialize};
use url::Url;

/// One resized, re-encoded copy of a source image
///
/// Created by the pipeline after a successful upload and never mutated.
/// The object it names is deleted only by the cleanup consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeArtifact {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub locator: Url,
}

impl DerivativeArtifact {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, size: ResolutionEntry, locator: Url) -> Self {
        Self {
            name: name.into(),
            width: size.width,
            height: size.height,
            locator,
        }
    }

    /// Resolved dimensions
    #[inline]
    #[must_use]
    pub fn size(&self) -> ResolutionEntry {
        ResolutionEntry::new(self.width, self.height)
    }
}
