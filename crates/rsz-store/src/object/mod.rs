//! Object store capability
//!
//! One logical container of flat-named objects. Backends:
//! - [`MemoryObjectStore`]: `DashMap`-backed, process local
//! - [`FsObjectStore`]: one directory per container, atomic writes

mod fs;
mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use std::fmt::Debug;
use url::Url;

/// Object store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Name is not a flat, URL-safe object name
    #[error("invalid object name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Object does not exist
    #[error("object not found: {0}")]
    NotFound(String),

    /// Backend IO failure
    #[error("io error on object '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Locator could not be built
    #[error("invalid locator: {0}")]
    Locator(String),

    /// Backend refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn io(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            name: name.into(),
            source,
        }
    }
}

/// Blob storage used for sources and derivatives
///
/// # Contract
/// - `put` overwrites and returns the object's public locator
/// - `get` of a missing name is [`StoreError::NotFound`]
/// - `delete` returns whether the object existed; missing is not an error
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<Url, StoreError>;

    async fn get(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    async fn delete(&self, name: &str) -> Result<bool, StoreError>;
}

/// Check that `name` is a flat object name
///
/// Allowed: ASCII alphanumerics, `.`, `_`, `-`; not `.` or `..`.
///
/// # Errors
/// Returns [`StoreError::InvalidName`] otherwise
pub fn validate_object_name(name: &str) -> Result<(), StoreError> {
    let reason = if name.is_empty() {
        Some("empty")
    } else if name == "." || name == ".." {
        Some("relative path component")
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        Some("only ASCII alphanumerics, '.', '_' and '-' are allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Maps object names to public URLs under a base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    base: Url,
}

impl Locator {
    /// Base is treated as a directory (a trailing `/` is added if missing)
    ///
    /// # Errors
    /// Returns error if the URL cannot be a base
    pub fn new(mut base: Url) -> Result<Self, StoreError> {
        if base.cannot_be_a_base() {
            return Err(StoreError::Locator(format!("{base} cannot be a base URL")));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    #[inline]
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Locator for a validated object name
    ///
    /// # Errors
    /// Returns error if the name is invalid
    pub fn locate(&self, name: &str) -> Result<Url, StoreError> {
        validate_object_name(name)?;
        self.base
            .join(name)
            .map_err(|e| StoreError::Locator(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_accepted() {
        for name in ["abc.png", "960x600_01hzz.webp", "a-b_c.d"] {
            assert!(validate_object_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn unsafe_names_rejected() {
        for name in ["", ".", "..", "a/b", "..\\x", "a b", "a,b", "q?x", "é.png"] {
            assert!(
                matches!(validate_object_name(name), Err(StoreError::InvalidName { .. })),
                "{name}"
            );
        }
    }

    #[test]
    fn locator_appends_to_base_directory() {
        let locator = Locator::new(Url::parse("https://cdn.example.com/images").unwrap()).unwrap();
        assert_eq!(
            locator.locate("960x600_a.png").unwrap().as_str(),
            "https://cdn.example.com/images/960x600_a.png"
        );
    }

    #[test]
    fn locator_rejects_opaque_base() {
        assert!(Locator::new(Url::parse("mailto:someone@example.com").unwrap()).is_err());
    }
}
