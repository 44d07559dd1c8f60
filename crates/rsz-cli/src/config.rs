//! Application configuration
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! `RSZ_*` environment overrides. The result is built once at startup and
//! handed to component constructors; nothing below this module reads the
//! environment.

use rsz_cleaner::{RetentionPolicy, DEFAULT_INTERVAL, DEFAULT_RETENTION_MINUTES};
use rsz_pipeline::{PipelineConfig, TranscoderConfig, UploadPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const ENV_STORAGE_ROOT: &str = "RSZ_STORAGE_ROOT";
pub const ENV_PUBLIC_BASE_URL: &str = "RSZ_PUBLIC_BASE_URL";
pub const ENV_QUEUE_DIR: &str = "RSZ_QUEUE_DIR";
pub const ENV_RETENTION_MINUTES: &str = "RSZ_RETENTION_MINUTES";
pub const ENV_CLEANUP_INTERVAL_SECS: &str = "RSZ_CLEANUP_INTERVAL_SECS";
pub const ENV_LOG_FORMAT: &str = "RSZ_LOG_FORMAT";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`AppConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override could not be parsed
    #[error("invalid value {value:?} for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// Values parse but make no sense together
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Object store location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the container's objects
    pub root: PathBuf,
    /// Base for public locators; defaults to a `file://` URL of `root`
    pub public_base_url: Option<Url>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/objects"),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub dir: PathBuf,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/queue"),
        }
    }
}

/// Consumer timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub retention_minutes: u32,
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            retention_minutes: DEFAULT_RETENTION_MINUTES,
            interval_secs: DEFAULT_INTERVAL.as_secs(),
        }
    }
}

impl CleanupConfig {
    #[inline]
    #[must_use]
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::from_minutes(self.retention_minutes)
    }

    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected text or json, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub queue: QueueConfig,
    pub cleanup: CleanupConfig,
    pub upload: UploadPolicy,
    pub transcoder: TranscoderConfig,
    pub log: LogConfig,
}

impl AppConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML; missing sections and fields take defaults
    ///
    /// # Errors
    /// Returns error on malformed TOML or invalid values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the file at `path` if given
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `RSZ_*` overrides using `lookup` to fetch variables
    ///
    /// # Errors
    /// Returns error if an override does not parse
    pub fn apply_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_STORAGE_ROOT) {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(base) = lookup(ENV_PUBLIC_BASE_URL) {
            self.storage.public_base_url = Some(parse_env(ENV_PUBLIC_BASE_URL, base)?);
        }
        if let Some(dir) = lookup(ENV_QUEUE_DIR) {
            self.queue.dir = PathBuf::from(dir);
        }
        if let Some(minutes) = lookup(ENV_RETENTION_MINUTES) {
            self.cleanup.retention_minutes = parse_env(ENV_RETENTION_MINUTES, minutes)?;
        }
        if let Some(secs) = lookup(ENV_CLEANUP_INTERVAL_SECS) {
            self.cleanup.interval_secs = parse_env(ENV_CLEANUP_INTERVAL_SECS, secs)?;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.log.format = parse_env(ENV_LOG_FORMAT, format)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// # Errors
    /// Returns error if a value is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cleanup.interval_secs == 0 {
            return Err(ConfigError::Invalid("cleanup.interval_secs must be positive".into()));
        }
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Invalid("upload.max_bytes must be positive".into()));
        }
        if !(1..=100).contains(&self.transcoder.jpeg_quality) {
            return Err(ConfigError::Invalid("transcoder.jpeg_quality must be in 1..=100".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage.root = root.into();
        self
    }

    #[must_use]
    pub fn with_queue_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.queue.dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_public_base_url(mut self, base: Url) -> Self {
        self.storage.public_base_url = Some(base);
        self
    }

    #[must_use]
    pub fn with_retention_minutes(mut self, minutes: u32) -> Self {
        self.cleanup.retention_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.cleanup.interval_secs = secs;
        self
    }

    /// Pipeline settings with the fixed production catalog
    #[must_use]
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            upload: self.upload,
            transcoder: self.transcoder,
            ..PipelineConfig::default()
        }
    }
}

fn parse_env<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.trim().parse::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Env {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
