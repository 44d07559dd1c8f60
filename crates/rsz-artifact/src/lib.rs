//! Resizer Artifact Model
//!
//! Pure, dependency-light types shared by the pipeline and the cleaner.
//!
//! # Core Concepts
//!
//! - [`ResolutionCatalog`]: fixed ordered list of derivative sizes
//! - [`Orientation`]: landscape keeps `(w, h)`, portrait swaps to `(h, w)`
//! - [`EncodingKind`]: target encoding, or passthrough of the source format
//! - [`StorageName`] / [`derivative_name`]: deterministic object naming
//! - [`DerivativeArtifact`]: one uploaded derivative and its locator
//! - [`CleanupRecord`]: the comma-joined deletion list for one pipeline run
//!
//! # Example
//!
//! ```rust
//! use rsz_artifact::{derivative_name, Orientation, ResolutionCatalog};
//!
//! let catalog = ResolutionCatalog::standard();
//! let first = catalog.entries()[0].oriented(Orientation::Portrait);
//! assert_eq!((first.width, first.height), (1284, 2778));
//! assert_eq!(derivative_name("abc.png", 960, 600), "960x600_abc.png");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod catalog;
mod derivative;
mod encoding;
mod naming;
mod record;

pub use catalog::{CatalogError, Orientation, ResolutionCatalog, ResolutionEntry};
pub use derivative::DerivativeArtifact;
pub use encoding::{EncodingKind, ParseEnumError};
pub use naming::{derivative_name, StorageName};
pub use record::{CleanupRecord, RecordError, NAME_SEPARATOR};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn catalog_names_feed_cleanup_record() {
        let source = StorageName::from_raw("01hzzzzzzzzzzzzzzzzzzzzzzz.png");
        let names: Vec<String> = ResolutionCatalog::standard()
            .oriented(Orientation::Landscape)
            .map(|e| derivative_name(source.as_str(), e.width, e.height))
            .collect();

        let record = CleanupRecord::new(names.clone()).unwrap();
        let parsed = CleanupRecord::parse(&record.to_payload());
        assert_eq!(parsed.names(), names.as_slice());
        assert_eq!(parsed.names()[0], "2778x1284_01hzzzzzzzzzzzzzzzzzzzzzzz.png");
    }
}
