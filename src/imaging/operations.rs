//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take one cell of the planning matrix, compute parameters, call the
//! backend, and write the result.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_variant_dimensions;
use super::params::{Cell, EncodeParams};
use crate::naming::variant_file_name;
use crate::plan::VariantCellError;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// A variant that was encoded and written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedVariant {
    /// File name inside the output directory, e.g. `sunset-800w.webp`.
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
}

/// Plan an encode operation without executing it.
pub fn plan_variant(source: &Path, original: Dimensions, cell: Cell) -> EncodeParams {
    let (width, height) = calculate_variant_dimensions(original.as_tuple(), cell.target_width);

    EncodeParams {
        source: source.to_path_buf(),
        format: cell.format,
        width,
        height,
        quality: cell.quality,
    }
}

/// Encode one cell and write it as `{stem}-{width}w.{format}` in `output_dir`.
///
/// `output_dir` must already exist.
pub fn encode_variant(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    stem: &str,
    original: Dimensions,
    cell: Cell,
) -> std::result::Result<EncodedVariant, VariantCellError> {
    let params = plan_variant(source, original, cell);
    let bytes = backend.encode(&params)?;

    let file_name = variant_file_name(stem, cell.target_width, cell.format);
    std::fs::write(output_dir.join(&file_name), &bytes)?;

    Ok(EncodedVariant {
        file_name,
        width: params.width,
        height: params.height,
        bytes: bytes.len() as u64,
    })
}
