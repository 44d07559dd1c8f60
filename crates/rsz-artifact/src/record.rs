//! Cleanup record codec
//!
//! One record per pipeline run, carried as a single queue payload: the
//! derivative names joined by [`NAME_SEPARATOR`]. The enqueue timestamp is
//! owned by the queue, not by the payload.

use serde::{Deserialize, Serialize};

/// Separator between names in a serialized record
pub const NAME_SEPARATOR: char = ',';

/// Record validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Empty or whitespace-only name
    #[error("cleanup record name at index {0} is empty")]
    EmptyName(usize),

    /// Name would be split apart on parse
    #[error("cleanup record name '{0}' contains the separator")]
    ContainsSeparator(String),

    /// Name would be trimmed on parse
    #[error("cleanup record name '{0}' has surrounding whitespace")]
    SurroundingWhitespace(String),
}

/// Ordered list of object names to delete once the record ages out
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CleanupRecord {
    names: Vec<String>,
}

impl CleanupRecord {
    /// Build a record, validating every name
    ///
    /// # Errors
    /// Returns error if a name is blank, contains [`NAME_SEPARATOR`], or
    /// would not survive [`CleanupRecord::parse`] unchanged
    pub fn new(names: Vec<String>) -> Result<Self, RecordError> {
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(RecordError::EmptyName(i));
            }
            if name.contains(NAME_SEPARATOR) {
                return Err(RecordError::ContainsSeparator(name.clone()));
            }
            if name.trim() != name {
                return Err(RecordError::SurroundingWhitespace(name.clone()));
            }
        }
        Ok(Self { names })
    }

    /// Parse a queue payload
    ///
    /// Lenient: entries are trimmed and empty entries dropped, so both
    /// `"a,b"` and `"a, b"` yield `["a", "b"]`.
    #[must_use]
    pub fn parse(payload: &str) -> Self {
        Self {
            names: payload
                .split(NAME_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Serialize to a single queue payload
    #[must_use]
    pub fn to_payload(&self) -> String {
        let mut sep = [0u8; 4];
        self.names.join(NAME_SEPARATOR.encode_utf8(&mut sep))
    }

    #[inline]
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    #[must_use]
    pub fn into_names(self) -> Vec<String> {
        self.names
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn round_trip_preserves_order() {
        let record = CleanupRecord::new(names(&["a", "b", "c"])).unwrap();
        assert_eq!(record.to_payload(), "a,b,c");
        assert_eq!(CleanupRecord::parse(&record.to_payload()).names(), &names(&["a", "b", "c"]));
    }

    #[test]
    fn parse_accepts_spaced_separator() {
        let record = CleanupRecord::parse("960x600_x.png, 960x640_x.png");
        assert_eq!(record.names(), &names(&["960x600_x.png", "960x640_x.png"]));
    }

    #[test]
    fn parse_drops_empty_entries() {
        assert_eq!(CleanupRecord::parse(",a,, ,b,").names(), &names(&["a", "b"]));
        assert!(CleanupRecord::parse("").is_empty());
    }

    #[test]
    fn separator_in_name_rejected() {
        let err = CleanupRecord::new(names(&["ok", "bad,name"])).unwrap_err();
        assert_eq!(err, RecordError::ContainsSeparator("bad,name".to_string()));
    }

    #[test]
    fn blank_name_rejected() {
        assert_eq!(
            CleanupRecord::new(names(&["a", "  "])),
            Err(RecordError::EmptyName(1))
        );
    }

    proptest! {
        #[test]
        fn prop_valid_records_round_trip(
            raw in prop::collection::vec("[0-9]{1,4}x[0-9]{1,4}_[a-z0-9]{1,26}\\.[a-z]{3,4}", 0..12)
        ) {
            let record = CleanupRecord::new(raw.clone()).unwrap();
            let parsed = CleanupRecord::parse(&record.to_payload());
            prop_assert_eq!(parsed.into_names(), raw);
        }
    }
}
