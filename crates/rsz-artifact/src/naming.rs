//! Object naming
//!
//! Sources get a fresh, unique name; derivatives are named from their
//! source so the mapping is deterministic and reversible by eye.

use crate::encoding::EncodingKind;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use ulid::Ulid;

/// Name of an uploaded source object: `"{ulid}.{ext}"`, lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageName(String);

impl StorageName {
    /// Allocate a fresh unique name for an upload
    #[must_use]
    pub fn generate(encoding: EncodingKind, declared_mime: &str) -> Self {
        let id = Ulid::new().to_string().to_ascii_lowercase();
        Self(format!("{id}.{}", encoding.extension(declared_mime)))
    }

    /// Wrap an existing name (no validation)
    #[inline]
    #[must_use]
    pub fn from_raw(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension after the last `.`, if any
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }
}

impl Display for StorageName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derivative name: `"{width}x{height}_{source_name}"`
///
/// `width`/`height` are the resolved (already oriented) dimensions.
#[inline]
#[must_use]
pub fn derivative_name(source_name: &str, width: u32, height: u32) -> String {
    format!("{width}x{height}_{source_name}")
}
