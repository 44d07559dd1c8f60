//! Upload admission policy

use crate::error::UploadRejection;
use serde::{Deserialize, Serialize};

/// Default size limit: 5 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Checks applied to an upload before any decoding or storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    /// Declared MIME type must be `image/*`
    pub require_image_mime: bool,
}

impl UploadPolicy {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// # Errors
    /// Returns the first violated rule
    pub fn check(&self, size: usize, declared_mime: &str) -> Result<(), UploadRejection> {
        if size == 0 {
            return Err(UploadRejection::Empty);
        }
        if size > self.max_bytes {
            return Err(UploadRejection::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        if self.require_image_mime && !is_image_mime(declared_mime) {
            return Err(UploadRejection::NotAnImage(declared_mime.to_string()));
        }
        Ok(())
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            require_image_mime: true,
        }
    }
}

fn is_image_mime(mime: &str) -> bool {
    mime.trim()
        .split_once('/')
        .is_some_and(|(kind, sub)| kind.eq_ignore_ascii_case("image") && !sub.trim().is_empty())
}
