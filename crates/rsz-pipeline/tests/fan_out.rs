//! End-to-end pipeline runs against in-memory stores

use pretty_assertions::assert_eq;
use rsz_artifact::{
    CleanupRecord, EncodingKind, Orientation, ResolutionCatalog, ResolutionEntry,
};
use rsz_pipeline::{
    CleanupRecordWriter, CleanupStatus, FailureKind, FanOutPipeline, PipelineConfig,
    PipelineError, UploadPolicy, UploadRejection,
};
use rsz_store::{CleanupQueue, MemoryObjectStore, MemoryQueue, ObjectStore, SystemClock};
use rsz_test_utils::{gif_fixture, jpeg_fixture, png_fixture, FaultyObjectStore, UnavailableQueue};
use std::sync::Arc;

fn small_catalog() -> ResolutionCatalog {
    ResolutionCatalog::new(vec![
        ResolutionEntry::new(8, 4),
        ResolutionEntry::new(6, 3),
        ResolutionEntry::new(4, 2),
    ])
    .unwrap()
}

struct Harness {
    store: Arc<MemoryObjectStore>,
    queue: Arc<MemoryQueue>,
    pipeline: FanOutPipeline,
}

fn harness(catalog: ResolutionCatalog) -> Harness {
    let store = Arc::new(MemoryObjectStore::new("uploads").unwrap());
    let queue = Arc::new(MemoryQueue::new(Arc::new(SystemClock)));
    let pipeline = FanOutPipeline::new(
        store.clone(),
        CleanupRecordWriter::new(queue.clone()),
        PipelineConfig::new().with_catalog(catalog),
    );
    Harness {
        store,
        queue,
        pipeline,
    }
}

#[tokio::test]
async fn full_catalog_produces_every_derivative() {
    let h = harness(ResolutionCatalog::standard());
    let outcome = h
        .pipeline
        .process(jpeg_fixture(64, 48), "image/jpeg", EncodingKind::Jpeg, Orientation::Landscape)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.derivatives.len(), 10);
    // source + ten derivatives
    assert_eq!(h.store.len(), 11);
    assert!(matches!(outcome.cleanup, CleanupStatus::Enqueued { .. }));
    assert_eq!(h.queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn locators_and_cleanup_names_are_index_aligned() {
    let h = harness(small_catalog());
    let outcome = h
        .pipeline
        .process(png_fixture(16, 16), "image/png", EncodingKind::Png, Orientation::Landscape)
        .await
        .unwrap();

    let locators = outcome.locators();
    let names = outcome.cleanup_names();
    assert_eq!(locators.len(), names.len());
    for (locator, name) in locators.iter().zip(&names) {
        assert!(locator.as_str().ends_with(name.as_str()), "{locator} vs {name}");
    }

    let source = &outcome.source.name;
    assert!(source.ends_with(".png"));
    assert_eq!(
        names,
        vec![
            format!("8x4_{source}"),
            format!("6x3_{source}"),
            format!("4x2_{source}"),
        ]
    );

    let record = h.queue.peek().await.unwrap().unwrap();
    assert_eq!(CleanupRecord::parse(&record.payload).into_names(), names);
}

#[tokio::test]
async fn source_is_not_part_of_cleanup_record() {
    let h = harness(small_catalog());
    let outcome = h
        .pipeline
        .process(png_fixture(16, 16), "image/png", EncodingKind::Webp, Orientation::Landscape)
        .await
        .unwrap();

    assert!(h.store.contains(&outcome.source.name));
    assert!(!outcome.cleanup_names().contains(&outcome.source.name));
}

#[tokio::test]
async fn orientation_swaps_stored_dimensions() {
    let catalog = ResolutionCatalog::new(vec![ResolutionEntry::new(2778, 1284)]).unwrap();

    for (orientation, expected) in [
        (Orientation::Landscape, (2778, 1284)),
        (Orientation::Portrait, (1284, 2778)),
    ] {
        let h = harness(catalog.clone());
        let outcome = h
            .pipeline
            .process(jpeg_fixture(40, 30), "image/jpeg", EncodingKind::Jpeg, orientation)
            .await
            .unwrap();

        let derivative = &outcome.derivatives[0];
        assert_eq!((derivative.width, derivative.height), expected);

        let stored = h.store.get(&derivative.name).await.unwrap();
        let decoded = image::load_from_memory(&stored).unwrap();
        assert_eq!((decoded.width(), decoded.height()), expected, "{orientation}");
        assert!(derivative.name.starts_with(&format!("{}x{}_", expected.0, expected.1)));
    }
}

#[tokio::test]
async fn passthrough_keeps_declared_extension_and_source_format() {
    let h = harness(small_catalog());
    let outcome = h
        .pipeline
        .process(png_fixture(10, 10), "image/png", EncodingKind::Passthrough, Orientation::Landscape)
        .await
        .unwrap();

    assert!(outcome.source.name.ends_with(".png"));
    let stored = h.store.get(&outcome.derivatives[0].name).await.unwrap();
    assert_eq!(image::guess_format(&stored).unwrap(), image::ImageFormat::Png);
}

#[tokio::test]
async fn undecodable_source_uploads_nothing() {
    let store = Arc::new(FaultyObjectStore::new());
    let queue = Arc::new(MemoryQueue::new(Arc::new(SystemClock)));
    let pipeline = FanOutPipeline::new(
        store.clone(),
        CleanupRecordWriter::new(queue.clone()),
        PipelineConfig::new().with_catalog(small_catalog()),
    );

    let err = pipeline
        .process(b"GIF89a but not really".to_vec(), "image/gif", EncodingKind::Png, Orientation::Landscape)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Decode(_)));
    assert!(err.is_client_error());
    assert_eq!(store.put_calls(), 0);
    assert!(queue.snapshot().is_empty());
}

#[tokio::test]
async fn policy_rejection_happens_before_any_work() {
    let store = Arc::new(FaultyObjectStore::new());
    let queue = Arc::new(MemoryQueue::new(Arc::new(SystemClock)));
    let pipeline = FanOutPipeline::new(
        store.clone(),
        CleanupRecordWriter::new(queue.clone()),
        PipelineConfig::new()
            .with_catalog(small_catalog())
            .with_upload_policy(UploadPolicy::new().with_max_bytes(16)),
    );

    let err = pipeline
        .process(png_fixture(32, 32), "image/png", EncodingKind::Png, Orientation::Landscape)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Rejected(UploadRejection::TooLarge { limit: 16, .. })
    ));

    let err = pipeline
        .process(b"hello".to_vec(), "text/plain", EncodingKind::Png, Orientation::Landscape)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Rejected(UploadRejection::NotAnImage(_))));

    assert_eq!(store.put_calls(), 0);
    assert!(queue.snapshot().is_empty());
}

#[tokio::test]
async fn source_upload_failure_is_fatal() {
    let store = Arc::new(FaultyObjectStore::new());
    store.fail_puts_containing(".");
    let queue = Arc::new(MemoryQueue::new(Arc::new(SystemClock)));
    let pipeline = FanOutPipeline::new(
        store.clone(),
        CleanupRecordWriter::new(queue.clone()),
        PipelineConfig::new().with_catalog(small_catalog()),
    );

    let err = pipeline
        .process(png_fixture(8, 8), "image/png", EncodingKind::Png, Orientation::Landscape)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::SourceUpload { .. }));
    assert!(!err.is_client_error());
    assert_eq!(store.put_calls(), 1);
    assert!(queue.snapshot().is_empty());
}

#[tokio::test]
async fn failed_derivative_is_skipped_and_not_recorded() {
    let store = Arc::new(FaultyObjectStore::new());
    store.fail_puts_containing("6x3_");
    let queue = Arc::new(MemoryQueue::new(Arc::new(SystemClock)));
    let pipeline = FanOutPipeline::new(
        store.clone(),
        CleanupRecordWriter::new(queue.clone()),
        PipelineConfig::new().with_catalog(small_catalog()),
    );

    let outcome = pipeline
        .process(png_fixture(12, 12), "image/png", EncodingKind::Png, Orientation::Landscape)
        .await
        .unwrap();

    assert!(!outcome.is_complete());
    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.index, 1);
    assert_eq!(failure.size, ResolutionEntry::new(6, 3));
    assert_eq!(failure.kind, FailureKind::Upload);

    let sizes: Vec<_> = outcome.derivatives.iter().map(|d| d.size()).collect();
    assert_eq!(sizes, vec![ResolutionEntry::new(8, 4), ResolutionEntry::new(4, 2)]);

    let record = queue.snapshot().remove(0);
    assert_eq!(
        CleanupRecord::parse(&record.payload).into_names(),
        outcome.cleanup_names()
    );
}

#[tokio::test]
async fn unencodable_size_is_skipped_as_transcode_failure() {
    // GIF frames are limited to u16 dimensions.
    let catalog = ResolutionCatalog::new(vec![
        ResolutionEntry::new(8, 4),
        ResolutionEntry::new(65_536, 1),
        ResolutionEntry::new(4, 2),
    ])
    .unwrap();
    let h = harness(catalog);

    let outcome = h
        .pipeline
        .process(gif_fixture(8, 8), "image/gif", EncodingKind::Passthrough, Orientation::Landscape)
        .await
        .unwrap();

    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.index, 1);
    assert_eq!(failure.size, ResolutionEntry::new(65_536, 1));
    assert_eq!(failure.kind, FailureKind::Transcode);

    let sizes: Vec<_> = outcome.derivatives.iter().map(|d| d.size()).collect();
    assert_eq!(sizes, vec![ResolutionEntry::new(8, 4), ResolutionEntry::new(4, 2)]);
    assert!(matches!(outcome.cleanup, CleanupStatus::Enqueued { .. }));

    let record = h.queue.snapshot().remove(0);
    assert_eq!(
        CleanupRecord::parse(&record.payload).into_names(),
        outcome.cleanup_names()
    );
    assert_eq!(h.store.len(), 3);
}

#[tokio::test]
async fn zero_derivatives_writes_no_record() {
    let store = Arc::new(FaultyObjectStore::new());
    for fragment in ["8x4_", "6x3_", "4x2_"] {
        store.fail_puts_containing(fragment);
    }
    let queue = Arc::new(MemoryQueue::new(Arc::new(SystemClock)));
    let pipeline = FanOutPipeline::new(
        store.clone(),
        CleanupRecordWriter::new(queue.clone()),
        PipelineConfig::new().with_catalog(small_catalog()),
    );

    let outcome = pipeline
        .process(png_fixture(12, 12), "image/png", EncodingKind::Png, Orientation::Landscape)
        .await
        .unwrap();

    assert!(outcome.derivatives.is_empty());
    assert_eq!(outcome.failures.len(), 3);
    assert_eq!(outcome.cleanup, CleanupStatus::NothingToClean);
    assert!(queue.snapshot().is_empty());
    // the source itself was stored
    assert!(store.inner().contains(&outcome.source.name));
}

#[tokio::test]
async fn queue_outage_is_reported_not_raised() {
    let store = Arc::new(MemoryObjectStore::new("uploads").unwrap());
    let pipeline = FanOutPipeline::new(
        store.clone(),
        CleanupRecordWriter::new(Arc::new(UnavailableQueue::default())),
        PipelineConfig::new().with_catalog(small_catalog()),
    );

    let outcome = pipeline
        .process(png_fixture(12, 12), "image/png", EncodingKind::Png, Orientation::Landscape)
        .await
        .unwrap();

    assert_eq!(outcome.derivatives.len(), 3);
    assert!(matches!(outcome.cleanup, CleanupStatus::Failed { .. }));
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn each_run_gets_its_own_record() {
    let h = harness(small_catalog());
    for _ in 0..2 {
        h.pipeline
            .process(png_fixture(9, 9), "image/png", EncodingKind::Png, Orientation::Portrait)
            .await
            .unwrap();
    }

    let records = h.queue.snapshot();
    assert_eq!(records.len(), 2);
    assert_ne!(records[0].payload, records[1].payload);
    assert_ne!(records[0].id, records[1].id);
}

#[test]
fn resolutions_exposes_the_configured_catalog() {
    let h = harness(small_catalog());
    assert_eq!(h.pipeline.resolutions(), &small_catalog());
    assert_eq!(
        harness(ResolutionCatalog::standard()).pipeline.resolutions().len(),
        10
    );
}
