//! Fan-out pipeline
//!
//! One source in, up to `catalog.len()` derivatives out. The source is
//! decoded exactly once and the decoded image is shared (read-only) by
//! every per-entry transcode.

use crate::error::{PipelineError, TranscodeError};
use crate::outcome::{CleanupStatus, DerivativeFailure, FailureKind, ProcessOutcome, SourceSummary};
use crate::transcoder::{DecodedImage, Transcoder, TranscoderConfig};
use crate::upload::UploadPolicy;
use crate::writer::CleanupRecordWriter;
use rsz_artifact::{
    derivative_name, DerivativeArtifact, EncodingKind, Orientation, ResolutionCatalog,
    ResolutionEntry, StorageName,
};
use rsz_store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Not loaded from config files; the production catalog is fixed
    #[serde(skip)]
    pub catalog: ResolutionCatalog,
    pub upload: UploadPolicy,
    pub transcoder: TranscoderConfig,
}

impl PipelineConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_catalog(mut self, catalog: ResolutionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_upload_policy(mut self, upload: UploadPolicy) -> Self {
        self.upload = upload;
        self
    }
}

/// Source image owned by one run
///
/// Dropped at the end of [`FanOutPipeline::process`] on every path, which
/// releases the decoded buffer once the last worker's clone is gone.
struct SourceArtifact {
    storage_name: StorageName,
    image: Arc<DecodedImage>,
}

/// Drives Transcoder × catalog and uploads the results
#[derive(Debug, Clone)]
pub struct FanOutPipeline {
    store: Arc<dyn ObjectStore>,
    writer: CleanupRecordWriter,
    transcoder: Arc<Transcoder>,
    catalog: Arc<ResolutionCatalog>,
    policy: UploadPolicy,
}

impl FanOutPipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        writer: CleanupRecordWriter,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            writer,
            transcoder: Arc::new(Transcoder::new(config.transcoder)),
            catalog: Arc::new(config.catalog),
            policy: config.upload,
        }
    }

    /// The catalog every run uses, for display by the caller
    #[inline]
    #[must_use]
    pub fn resolutions(&self) -> &ResolutionCatalog {
        &self.catalog
    }

    /// Run the full fan-out for one upload
    ///
    /// `declared_mime` is advisory: it picks the extension for
    /// [`EncodingKind::Passthrough`] and is checked by the upload policy.
    /// The image format itself is sniffed from the bytes.
    ///
    /// # Errors
    /// - [`PipelineError::Rejected`]: policy violation, nothing uploaded
    /// - [`PipelineError::Decode`]: not an image, nothing uploaded
    /// - [`PipelineError::SourceUpload`]: source could not be stored
    ///
    /// Per-derivative failures and cleanup enqueue failures are not errors;
    /// they are reported in the returned [`ProcessOutcome`].
    pub async fn process(
        &self,
        source: Vec<u8>,
        declared_mime: &str,
        encoding: EncodingKind,
        orientation: Orientation,
    ) -> Result<ProcessOutcome, PipelineError> {
        self.policy.check(source.len(), declared_mime)?;

        let storage_name = StorageName::generate(encoding, declared_mime);
        tracing::info!(
            storage_name = %storage_name,
            %encoding,
            %orientation,
            bytes = source.len(),
            "processing upload"
        );

        let (source, decoded) = decode_on_worker(source).await?;
        let decoded = decoded.map_err(|e| {
            tracing::error!(storage_name = %storage_name, error = %e, "source decode failed");
            PipelineError::Decode(e)
        })?;
        let artifact = SourceArtifact {
            storage_name,
            image: Arc::new(decoded),
        };

        let name = artifact.storage_name.as_str();
        let source_locator = self.store.put(name, source).await.map_err(|e| {
            tracing::error!(storage_name = name, error = %e, "source upload failed");
            PipelineError::SourceUpload {
                name: name.to_string(),
                source: e,
            }
        })?;

        let mut derivatives = Vec::with_capacity(self.catalog.len());
        let mut failures = Vec::new();
        for (index, size) in self.catalog.oriented(orientation).enumerate() {
            match self.derive(&artifact, size, encoding).await {
                Ok(derivative) => derivatives.push(derivative),
                Err((kind, reason)) => {
                    tracing::warn!(
                        storage_name = name,
                        index,
                        width = size.width,
                        height = size.height,
                        ?kind,
                        %reason,
                        "derivative skipped"
                    );
                    failures.push(DerivativeFailure {
                        index,
                        size,
                        kind,
                        reason,
                    });
                }
            }
        }

        let cleanup = self.enqueue_cleanup(&derivatives).await;
        tracing::info!(
            storage_name = name,
            produced = derivatives.len(),
            failed = failures.len(),
            "upload processed"
        );

        Ok(ProcessOutcome {
            source: SourceSummary {
                name: name.to_string(),
                locator: source_locator,
            },
            encoding,
            orientation,
            derivatives,
            failures,
            cleanup,
        })
    }

    /// Transcode and upload one catalog entry
    async fn derive(
        &self,
        source: &SourceArtifact,
        size: ResolutionEntry,
        encoding: EncodingKind,
    ) -> Result<DerivativeArtifact, (FailureKind, String)> {
        let image = Arc::clone(&source.image);
        let transcoder = Arc::clone(&self.transcoder);
        let encoded = tokio::task::spawn_blocking(move || transcoder.transcode(&image, size, encoding))
            .await
            .map_err(|e| (FailureKind::Transcode, format!("worker failed: {e}")))?
            .map_err(|e| (FailureKind::Transcode, e.to_string()))?;

        let name = derivative_name(source.storage_name.as_str(), size.width, size.height);
        tracing::debug!(object = %name, bytes = encoded.len(), "uploading derivative");

        let locator = self
            .store
            .put(&name, encoded)
            .await
            .map_err(|e| (FailureKind::Upload, e.to_string()))?;

        Ok(DerivativeArtifact::new(name, size, locator))
    }

    async fn enqueue_cleanup(&self, derivatives: &[DerivativeArtifact]) -> CleanupStatus {
        if derivatives.is_empty() {
            return CleanupStatus::NothingToClean;
        }

        let names: Vec<String> = derivatives.iter().map(|d| d.name.clone()).collect();
        match self.writer.enqueue(&names).await {
            Ok(record) => CleanupStatus::Enqueued {
                record_id: record.id,
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    leaked = names.len(),
                    "cleanup record not enqueued; derivatives will not be deleted"
                );
                CleanupStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

async fn decode_on_worker(
    bytes: Vec<u8>,
) -> Result<(Vec<u8>, Result<DecodedImage, TranscodeError>), PipelineError> {
    tokio::task::spawn_blocking(move || {
        let decoded = Transcoder::decode(&bytes);
        (bytes, decoded)
    })
    .await
    .map_err(|e| PipelineError::Worker(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_standard_catalog() {
        let config = PipelineConfig::new();
        assert_eq!(config.catalog, ResolutionCatalog::standard());
        assert_eq!(config.upload, UploadPolicy::default());
    }

    #[test]
    fn config_deserializes_without_catalog() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"upload": {"max_bytes": 10}}"#).unwrap();
        assert_eq!(config.upload.max_bytes, 10);
        assert!(config.upload.require_image_mime);
        assert_eq!(config.catalog.len(), 10);
    }
}
