//! Resolution catalog
//!
//! The fixed, ordered set of derivative sizes produced for every upload.
//! Sizes are stored landscape-first; [`Orientation::Portrait`] swaps them
//! per run.

use crate::encoding::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Production catalog, landscape dimensions, in processing order.
const STANDARD_SIZES: [(u32, u32); 10] = [
    (2778, 1284),
    (2688, 1242),
    (2532, 1170),
    (2436, 1125),
    (2340, 1080),
    (2208, 1242),
    (1136, 750),
    (1136, 640),
    (960, 600),
    (960, 640),
];

/// One target size in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolutionEntry {
    pub width: u32,
    pub height: u32,
}

impl ResolutionEntry {
    /// Create entry
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions to use for a run with the given orientation
    #[inline]
    #[must_use]
    pub const fn oriented(self, orientation: Orientation) -> Self {
        match orientation {
            Orientation::Landscape => self,
            Orientation::Portrait => Self {
                width: self.height,
                height: self.width,
            },
        }
    }
}

impl Display for ResolutionEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Orientation applied to every entry of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
        }
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landscape" => Ok(Self::Landscape),
            "portrait" => Ok(Self::Portrait),
            _ => Err(ParseEnumError::new("orientation", s)),
        }
    }
}

/// Catalog construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Catalog has no entries
    #[error("resolution catalog is empty")]
    Empty,

    /// Entry with a zero dimension
    #[error("resolution entry {index} has a zero dimension ({entry})")]
    ZeroDimension { index: usize, entry: ResolutionEntry },
}

/// Ordered, immutable list of target sizes
///
/// # Invariants
/// - At least one entry
/// - No zero dimensions
/// - Order is processing order; duplicates are allowed but pointless
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionCatalog {
    entries: Vec<ResolutionEntry>,
}

impl ResolutionCatalog {
    /// The fixed production catalog
    #[must_use]
    pub fn standard() -> Self {
        Self {
            entries: STANDARD_SIZES
                .iter()
                .map(|&(w, h)| ResolutionEntry::new(w, h))
                .collect(),
        }
    }

    /// Build a catalog from explicit entries
    ///
    /// # Errors
    /// Returns error if `entries` is empty or any entry has a zero dimension
    pub fn new(entries: Vec<ResolutionEntry>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        if let Some((index, entry)) = entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.width == 0 || e.height == 0)
        {
            return Err(CatalogError::ZeroDimension {
                index,
                entry: *entry,
            });
        }
        Ok(Self { entries })
    }

    /// Entries in landscape form
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[ResolutionEntry] {
        &self.entries
    }

    /// Entries with the orientation applied, in catalog order
    pub fn oriented(
        &self,
        orientation: Orientation,
    ) -> impl Iterator<Item = ResolutionEntry> + '_ {
        self.entries.iter().map(move |e| e.oriented(orientation))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResolutionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
