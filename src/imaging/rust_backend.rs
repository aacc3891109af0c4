//! Pure Rust image codec backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only, no full decode) |
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image` crate decoders; GIF yields its first frame |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder` (lossless) |
//! | Encode → WebP | `WebPEncoder::new_lossless` (quality has no effect) |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, OutputFormat};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::path::Path;

/// Encoder speed for AVIF (rav1e scale 1-10, higher is faster).
const AVIF_SPEED: u8 = 6;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Collapse to 8-bit RGB(A), which every lossy encoder here accepts.
fn to_8bit(img: DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

/// Encode a DynamicImage into an in-memory buffer.
fn encode_image(
    img: DynamicImage,
    format: OutputFormat,
    quality: u32,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let quality = quality.clamp(1, 100) as u8;

    let result = match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        }
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(&mut buf)),
        OutputFormat::Webp => to_8bit(img).write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
        OutputFormat::Avif => to_8bit(img).write_with_encoder(AvifEncoder::new_with_speed_quality(
            &mut buf, AVIF_SPEED, quality,
        )),
    };

    result.map_err(|e| BackendError::ProcessingFailed(format!("{} encode failed: {}", format, e)))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to read dimensions of {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Dimensions { width, height })
    }

    fn encode(&self, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let img = load_image(&params.source)?;
        let img = if img.width() == params.width && img.height() == params.height {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        encode_image(img, params.format, params.quality.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::test_helpers::{write_test_jpeg, write_test_png};

    fn encode_params(source: &Path, format: OutputFormat, width: u32, height: u32) -> EncodeParams {
        EncodeParams {
            source: source.to_path_buf(),
            format,
            width,
            height,
            quality: Quality::new(85),
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        write_test_jpeg(&path, 200, 150);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn identify_garbage_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        assert!(RustBackend::new().identify(&path).is_err());
    }

    #[test]
    fn encode_jpeg_resizes_to_requested_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        write_test_jpeg(&source, 400, 300);

        let bytes = RustBackend::new()
            .encode(&encode_params(&source, OutputFormat::Jpeg, 200, 150))
            .unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 150));
    }

    #[test]
    fn encode_webp_from_png_with_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        write_test_png(&source, 120, 80);

        let bytes = RustBackend::new()
            .encode(&encode_params(&source, OutputFormat::Webp, 60, 40))
            .unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (60, 40));
    }

    #[test]
    fn encode_png_at_native_size_skips_resample() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        write_test_png(&source, 64, 48);

        let bytes = RustBackend::new()
            .encode(&encode_params(&source, OutputFormat::Png, 64, 48))
            .unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn encode_jpeg_from_alpha_source_drops_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        write_test_png(&source, 32, 32);

        let bytes = RustBackend::new()
            .encode(&encode_params(&source, OutputFormat::Jpeg, 32, 32))
            .unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encode_avif_small_image() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        write_test_jpeg(&source, 64, 48);

        let bytes = RustBackend::new()
            .encode(&encode_params(&source, OutputFormat::Avif, 32, 24))
            .unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[4..8], b"ftyp");
    }

    #[test]
    fn encode_is_deterministic() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        write_test_jpeg(&source, 300, 200);

        let backend = RustBackend::new();
        let params = encode_params(&source, OutputFormat::Jpeg, 150, 100);
        assert_eq!(backend.encode(&params).unwrap(), backend.encode(&params).unwrap());
    }

    #[test]
    fn encode_nonexistent_source_is_io_error() {
        let result = RustBackend::new().encode(&encode_params(
            Path::new("/nonexistent/source.jpg"),
            OutputFormat::Jpeg,
            10,
            10,
        ));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }
}
