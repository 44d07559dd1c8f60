//! Target encodings and file-extension rules

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Fallback extension when neither encoding nor MIME type yields one.
const FALLBACK_EXTENSION: &str = "bin";

/// Error parsing one of the crate's string enums
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Encoding for every derivative of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingKind {
    Jpeg,
    Webp,
    Png,
    /// Keep the source format; extension comes from the declared MIME type
    #[default]
    Passthrough,
}

impl EncodingKind {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Passthrough => "passthrough",
        }
    }

    /// File extension for objects produced with this encoding
    ///
    /// For [`EncodingKind::Passthrough`] the MIME subtype is used:
    /// parameters and `+suffix` are stripped and the result lowercased,
    /// so `image/svg+xml` gives `svg`. Falls back to `bin`.
    #[must_use]
    pub fn extension(self, declared_mime: &str) -> String {
        match self {
            Self::Jpeg | Self::Webp | Self::Png => self.as_str().to_string(),
            Self::Passthrough => mime_subtype(declared_mime)
                .unwrap_or(FALLBACK_EXTENSION)
                .to_ascii_lowercase(),
        }
    }
}

fn mime_subtype(mime: &str) -> Option<&str> {
    let (_, rest) = mime.split_once('/')?;
    let subtype = rest.split(';').next()?.split('+').next()?.trim();
    let usable = subtype.starts_with(|c: char| c.is_ascii_alphanumeric())
        && subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    usable.then_some(subtype)
}

impl Display for EncodingKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncodingKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            "png" => Ok(Self::Png),
            "passthrough" | "source" => Ok(Self::Passthrough),
            _ => Err(ParseEnumError::new("encoding", s)),
        }
    }
}
