//! Shared test utilities for the srcsetter test suite.
//!
//! Provides synthetic image writers, file tree builders, and lookups over
//! planning results so unit tests can state their expectations compactly.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_test_jpeg(&tmp.path().join("photos/a.jpg"), 2000, 1500);
//! touch(&tmp.path().join("notes.txt"));
//! ```

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;

use crate::imaging::OutputFormat;
use crate::report::{ImageResult, MaterializedVariant};

// =========================================================================
// File tree setup
// =========================================================================

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
}

/// Create an empty file (and its parent directories).
pub fn touch(path: &Path) {
    ensure_parent(path);
    std::fs::write(path, b"").unwrap();
}

/// Write a small valid JPEG with the given dimensions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    ensure_parent(path);
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a small valid PNG with an alpha channel.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    ensure_parent(path);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, 64, (y % 256) as u8, 200])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

// =========================================================================
// Result lookups — panics with a clear message on miss
// =========================================================================

/// Find the variant for a (target width, format) cell. Panics if absent.
pub fn find_variant(
    result: &ImageResult,
    target_width: u32,
    format: OutputFormat,
) -> &MaterializedVariant {
    result
        .variants
        .iter()
        .find(|v| v.target_width == target_width && v.format == format)
        .unwrap_or_else(|| {
            let cells: Vec<String> = result
                .variants
                .iter()
                .map(|v| format!("{}@{}", v.format, v.target_width))
                .collect();
            panic!("variant {format}@{target_width} not found. Available: {cells:?}")
        })
}

/// All `(target_width, format)` cells that materialized, in result order.
pub fn cells_of(result: &ImageResult) -> Vec<(u32, OutputFormat)> {
    result
        .variants
        .iter()
        .map(|v| (v.target_width, v.format))
        .collect()
}
