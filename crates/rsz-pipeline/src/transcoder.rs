//! Resize + re-encode one derivative
//!
//! All work here is CPU-bound and synchronous; the pipeline runs it on
//! tokio's blocking pool.

use crate::error::TranscodeError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use rsz_artifact::{EncodingKind, ResolutionEntry};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// JPEG quality, 1..=100
    pub jpeg_quality: u8,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

/// A decoded source image plus the format it was decoded from
///
/// The source format is what [`EncodingKind::Passthrough`] re-encodes to.
#[derive(Debug)]
pub struct DecodedImage {
    image: DynamicImage,
    format: ImageFormat,
}

impl DecodedImage {
    #[inline]
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Resizes to an exact size and encodes
#[derive(Debug, Clone, Default)]
pub struct Transcoder {
    config: TranscoderConfig,
}

impl Transcoder {
    #[inline]
    #[must_use]
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Sniff the format from the bytes and decode
    ///
    /// The declared MIME type is never trusted for decoding.
    ///
    /// # Errors
    /// Returns error if the format is unknown or the data is corrupt
    pub fn decode(bytes: &[u8]) -> Result<DecodedImage, TranscodeError> {
        let format = image::guess_format(bytes).map_err(TranscodeError::UnknownFormat)?;
        let image = image::load_from_memory_with_format(bytes, format)
            .map_err(|source| TranscodeError::Decode { format, source })?;
        Ok(DecodedImage { image, format })
    }

    /// Produce one derivative at exactly `size`
    ///
    /// Aspect ratio is not preserved; the catalog sizes are targets, not bounds.
    ///
    /// # Errors
    /// Returns error if the target format cannot encode the image
    pub fn transcode(
        &self,
        source: &DecodedImage,
        size: ResolutionEntry,
        encoding: EncodingKind,
    ) -> Result<Vec<u8>, TranscodeError> {
        let format = target_format(encoding, source.format);
        let resized = source
            .image
            .resize_exact(size.width, size.height, FilterType::CatmullRom);
        let resized = normalize_for(format, resized);

        let mut out = Cursor::new(Vec::new());
        let written = if format == ImageFormat::Jpeg {
            let quality = self.config.jpeg_quality.clamp(1, 100);
            resized.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        } else {
            resized.write_to(&mut out, format)
        };
        written.map_err(|source| TranscodeError::Encode { format, source })?;

        Ok(out.into_inner())
    }
}

fn target_format(encoding: EncodingKind, source: ImageFormat) -> ImageFormat {
    match encoding {
        EncodingKind::Jpeg => ImageFormat::Jpeg,
        EncodingKind::Webp => ImageFormat::WebP,
        EncodingKind::Png => ImageFormat::Png,
        EncodingKind::Passthrough => source,
    }
}

/// Convert to a pixel layout the target encoder accepts
fn normalize_for(format: ImageFormat, image: DynamicImage) -> DynamicImage {
    match format {
        ImageFormat::Png => image,
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ if image.color().has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn decode_reports_source_format() {
        let decoded = Transcoder::decode(&png_bytes(8, 4)).unwrap();
        assert_eq!(decoded.format(), ImageFormat::Png);
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            Transcoder::decode(b"definitely not an image"),
            Err(TranscodeError::UnknownFormat(_))
        ));
    }

    #[test]
    fn decode_rejects_truncated_png() {
        let bytes = png_bytes(16, 16);
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(
            Transcoder::decode(truncated),
            Err(TranscodeError::Decode { format: ImageFormat::Png, .. })
        ));
    }

    #[test]
    fn each_encoding_produces_exact_size() {
        let source = Transcoder::decode(&png_bytes(32, 20)).unwrap();
        let transcoder = Transcoder::default();

        for (encoding, expected) in [
            (EncodingKind::Jpeg, ImageFormat::Jpeg),
            (EncodingKind::Webp, ImageFormat::WebP),
            (EncodingKind::Png, ImageFormat::Png),
            (EncodingKind::Passthrough, ImageFormat::Png),
        ] {
            let bytes = transcoder
                .transcode(&source, ResolutionEntry::new(12, 30), encoding)
                .unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), expected, "{encoding}");
            let out = image::load_from_memory(&bytes).unwrap();
            assert_eq!((out.width(), out.height()), (12, 30), "{encoding}");
        }
    }

    #[test]
    fn transcoding_does_not_mutate_source() {
        let source = Transcoder::decode(&png_bytes(40, 40)).unwrap();
        let transcoder = Transcoder::default();
        transcoder
            .transcode(&source, ResolutionEntry::new(4, 4), EncodingKind::Png)
            .unwrap();
        assert_eq!((source.width(), source.height()), (40, 40));
    }
}
