//! Testing utilities for the Resizer workspace
//!
//! Shared fixtures: synthetic images, a clock pinned to a known instant,
//! and store/queue doubles that fail on demand.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};
use parking_lot::Mutex;
use rsz_store::{
    CleanupQueue, ManualClock, MemoryObjectStore, MemoryQueue, ObjectStore, QueueError,
    QueuedRecord, RecordId, StoreError,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

/// 2023-11-14T22:13:20Z
pub fn test_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(test_epoch()))
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// RGBA gradient PNG
pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 96, 255])
    });
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// RGB gradient JPEG
pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(y * 255 / height.max(1)) as u8, 64, (x * 255 / width.max(1)) as u8])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// Flat-colour GIF
pub fn gif_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Gif)
}

/// Memory store that fails `put`/`delete` for names containing chosen fragments
#[derive(Debug)]
pub struct FaultyObjectStore {
    inner: MemoryObjectStore,
    failing_puts: Mutex<Vec<String>>,
    failing_deletes: Mutex<Vec<String>>,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FaultyObjectStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryObjectStore::new("faulty").unwrap(),
            failing_puts: Mutex::new(Vec::new()),
            failing_deletes: Mutex::new(Vec::new()),
            put_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_puts_containing(&self, fragment: &str) {
        self.failing_puts.lock().push(fragment.to_string());
    }

    pub fn fail_deletes_containing(&self, fragment: &str) {
        self.failing_deletes.lock().push(fragment.to_string());
    }

    pub fn inner(&self) -> &MemoryObjectStore {
        &self.inner
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn matches(list: &Mutex<Vec<String>>, name: &str) -> bool {
        list.lock().iter().any(|f| name.contains(f.as_str()))
    }
}

impl Default for FaultyObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for FaultyObjectStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<Url, StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if Self::matches(&self.failing_puts, name) {
            return Err(StoreError::Unavailable(format!("injected put failure for {name}")));
        }
        self.inner.put(name, bytes).await
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.get(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if Self::matches(&self.failing_deletes, name) {
            return Err(StoreError::Unavailable(format!("injected delete failure for {name}")));
        }
        self.inner.delete(name).await
    }
}

/// Queue whose transport is always down
#[derive(Debug, Default)]
pub struct UnavailableQueue;

impl UnavailableQueue {
    fn down() -> QueueError {
        QueueError::Unavailable("injected queue outage".to_string())
    }
}

#[async_trait]
impl CleanupQueue for UnavailableQueue {
    async fn push(&self, _payload: String) -> Result<QueuedRecord, QueueError> {
        Err(Self::down())
    }

    async fn peek(&self) -> Result<Option<QueuedRecord>, QueueError> {
        Err(Self::down())
    }

    async fn pop(&self) -> Result<Option<QueuedRecord>, QueueError> {
        Err(Self::down())
    }

    async fn pop_if(&self, _id: RecordId) -> Result<Option<QueuedRecord>, QueueError> {
        Err(Self::down())
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Err(Self::down())
    }
}

/// Memory queue whose `pop_if` always loses the race, as if another
/// consumer claimed the head between peek and pop
#[derive(Debug)]
pub struct RacingQueue {
    inner: MemoryQueue,
}

impl RacingQueue {
    pub fn new(inner: MemoryQueue) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &MemoryQueue {
        &self.inner
    }
}

#[async_trait]
impl CleanupQueue for RacingQueue {
    async fn push(&self, payload: String) -> Result<QueuedRecord, QueueError> {
        self.inner.push(payload).await
    }

    async fn peek(&self) -> Result<Option<QueuedRecord>, QueueError> {
        self.inner.peek().await
    }

    async fn pop(&self) -> Result<Option<QueuedRecord>, QueueError> {
        self.inner.pop().await
    }

    async fn pop_if(&self, id: RecordId) -> Result<Option<QueuedRecord>, QueueError> {
        // The rival consumer wins.
        let _ = self.inner.pop_if(id).await?;
        Ok(None)
    }

    async fn len(&self) -> Result<usize, QueueError> {
        self.inner.len().await
    }
}
