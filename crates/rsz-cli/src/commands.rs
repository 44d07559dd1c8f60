//! Wiring and subcommand bodies
//!
//! `main.rs` parses arguments; everything it then does lives here so the
//! flows can be exercised without spawning the binary.

use crate::config::AppConfig;
use anyhow::Context;
use rsz_artifact::{EncodingKind, Orientation, ResolutionCatalog};
use rsz_cleaner::{CleanupConsumer, CleanupSchedule, DeletionReport};
use rsz_pipeline::{CleanupRecordWriter, CleanupStatus, FanOutPipeline, ProcessOutcome};
use rsz_store::{Clock, FsObjectStore, FsQueue, SystemClock};
use std::fmt::Write as _;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Filesystem-backed components built from one [`AppConfig`]
#[derive(Debug, Clone)]
pub struct Services {
    pub pipeline: FanOutPipeline,
    pub consumer: Arc<CleanupConsumer>,
    config: AppConfig,
}

impl Services {
    /// Open the object store and queue directories and assemble components
    ///
    /// # Errors
    /// Returns error if either directory cannot be opened
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// As [`Services::open`] with an explicit clock
    ///
    /// # Errors
    /// Returns error if either directory cannot be opened
    pub async fn open_with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let store = Arc::new(
            FsObjectStore::open(&config.storage.root, config.storage.public_base_url.clone())
                .await
                .with_context(|| format!("opening object store at {}", config.storage.root.display()))?,
        );
        let queue = Arc::new(
            FsQueue::open(&config.queue.dir, clock.clone())
                .await
                .with_context(|| format!("opening queue at {}", config.queue.dir.display()))?,
        );

        let pipeline = FanOutPipeline::new(
            store.clone(),
            CleanupRecordWriter::new(queue.clone()),
            config.pipeline(),
        );
        let consumer = Arc::new(CleanupConsumer::new(
            queue,
            store,
            clock,
            config.cleanup.retention(),
        ));

        Ok(Self {
            pipeline,
            consumer,
            config,
        })
    }

    /// Run the pipeline over one file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, its MIME type cannot be
    /// determined, or the pipeline rejects it
    pub async fn process_file(
        &self,
        path: &Path,
        mime: Option<&str>,
        encoding: EncodingKind,
        orientation: Orientation,
    ) -> anyhow::Result<ProcessOutcome> {
        let mime = match mime {
            Some(mime) => mime.to_string(),
            None => infer_mime(path)
                .with_context(|| format!("cannot infer MIME type of {}; pass --mime", path.display()))?
                .to_string(),
        };
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;

        let outcome = self
            .pipeline
            .process(bytes, &mime, encoding, orientation)
            .await
            .with_context(|| format!("processing {}", path.display()))?;
        Ok(outcome)
    }

    pub async fn clean_once(&self) -> DeletionReport {
        self.consumer.run_once().await
    }

    /// Run the schedule loop until `shutdown` resolves
    pub async fn clean_daemon<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        CleanupSchedule::new(self.consumer.clone(), self.config.cleanup.interval())
            .run(shutdown)
            .await
    }
}

/// MIME type from a file extension, for the formats the decoder supports
#[must_use]
pub fn infer_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Text rendering of a pipeline outcome
#[must_use]
pub fn render_outcome(outcome: &ProcessOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "source: {} -> {}", outcome.source.name, outcome.source.locator);
    for derivative in &outcome.derivatives {
        let _ = writeln!(out, "{}x{}\t{}", derivative.width, derivative.height, derivative.locator);
    }
    for failure in &outcome.failures {
        let _ = writeln!(out, "{}\tFAILED ({:?}): {}", failure.size, failure.kind, failure.reason);
    }
    let cleanup = match &outcome.cleanup {
        CleanupStatus::Enqueued { record_id } => format!("cleanup record {record_id} enqueued"),
        CleanupStatus::NothingToClean => "nothing to clean".to_string(),
        CleanupStatus::Failed { reason } => format!("cleanup record NOT enqueued: {reason}"),
    };
    let _ = writeln!(out, "{cleanup}");
    out
}

/// Text rendering of a cleanup report
#[must_use]
pub fn render_report(report: &DeletionReport) -> String {
    let mut out = format!("{}\n", report.summary());
    for name in &report.deleted {
        let _ = writeln!(out, "deleted\t{name}");
    }
    for failure in &report.failures {
        let _ = writeln!(out, "failed\t{}\t{:?}", failure.name, failure.reason);
    }
    out
}

/// Catalog entries as `WxH`, oriented
#[must_use]
pub fn resolution_lines(catalog: &ResolutionCatalog, orientation: Orientation) -> Vec<String> {
    catalog.oriented(orientation).map(|size| size.to_string()).collect()
}
