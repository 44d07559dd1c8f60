//! Resizer CLI
//!
//! Configuration loading, logging setup and the bodies of the `rsz`
//! subcommands. The binary in `main.rs` is a thin argument parser on top.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod commands;
pub mod config;
pub mod logging;

pub use commands::{infer_mime, render_outcome, render_report, resolution_lines, Services};
pub use config::{AppConfig, ConfigError, LogConfig, LogFormat};
pub use logging::init_logging;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
