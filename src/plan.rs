//! Per-image variant planning.
//!
//! Second stage of the pipeline. For one discovered image, fills the
//! width × format matrix of a [`VariantSpec`]:
//!
//! 1. Create the mirrored output sub-directory (idempotent, safe to race).
//! 2. Identify the source's intrinsic dimensions once.
//! 3. Encode every cell in parallel, never upscaling, and write it as
//!    `{stem}-{width}w.{format}`.
//!
//! Failures are cell-scoped: a cell that cannot be encoded or written becomes
//! a [`CellFailure`] in the result and the remaining cells carry on. If the
//! output directory cannot be created or the source cannot be identified,
//! every cell of that image fails, but the image still yields an
//! [`ImageResult`]. Nothing here returns an error to the caller.
//!
//! Two sources in one directory that share a stem (`a.jpg`, `a.png`) would
//! write the same variant files. The orchestrator lets the first in discovery
//! order keep the names and passes the others to [`colliding_image`], which
//! fails their cells without encoding.

use crate::config::VariantSpec;
use crate::discover::DiscoveredImage;
use crate::imaging::{BackendError, Cell, EncodedVariant, ImageBackend, encode_variant, get_dimensions};
use crate::naming::url_path;
use crate::report::{CellFailure, ImageResult, MaterializedVariant};
use crate::run::CancelToken;
use rayon::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Why one (width, format) cell produced no file.
#[derive(Error, Debug)]
pub enum VariantCellError {
    #[error("encode failed: {0}")]
    Encode(#[from] BackendError),
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("cannot identify source: {0}")]
    Identify(String),
    #[error("cannot create output directory {0}")]
    OutputDirectory(String),
    #[error("variant names already taken by {0}")]
    NameCollision(String),
}

/// Plan and materialize every cell of `spec` for one image under `output_root`.
///
/// Cells not yet started when `cancel` fires are skipped silently; they are
/// neither variants nor failures.
pub fn plan_image(
    backend: &impl ImageBackend,
    image: &DiscoveredImage,
    spec: &VariantSpec,
    output_root: &Path,
    cancel: &CancelToken,
) -> ImageResult {
    let mut result = empty_result(image);

    let output_dir = output_root.join(&image.sub_directory);
    if let Err(e) = std::fs::create_dir_all(&output_dir) {
        let err = VariantCellError::OutputDirectory(format!("{}: {e}", output_dir.display()));
        fail_every_cell(&mut result, spec, &err);
        return result;
    }

    let original = match get_dimensions(backend, &image.absolute_path) {
        Ok(dims) => dims,
        Err(e) => {
            fail_every_cell(&mut result, spec, &VariantCellError::Identify(e.to_string()));
            return result;
        }
    };
    result.dimensions = Some(original);

    let stem = image.stem();
    let outcomes: Vec<(Cell, Option<Result<EncodedVariant, VariantCellError>>)> = spec
        .cells()
        .into_par_iter()
        .map(|cell| {
            if cancel.is_cancelled() {
                return (cell, None);
            }
            let outcome = encode_variant(
                backend,
                &image.absolute_path,
                &output_dir,
                &stem,
                original,
                cell,
            );
            (cell, Some(outcome))
        })
        .collect();

    for (cell, outcome) in outcomes {
        match outcome {
            None => {}
            Some(Ok(encoded)) => {
                debug!(
                    image = %image.relative_path.display(),
                    file = %encoded.file_name,
                    width = encoded.width,
                    height = encoded.height,
                    bytes = encoded.bytes,
                    "variant written"
                );
                result.variants.push(MaterializedVariant {
                    source_relative_path: image.relative_path.clone(),
                    target_width: cell.target_width,
                    width: encoded.width,
                    height: encoded.height,
                    format: cell.format,
                    output_relative_path: url_path(&image.sub_directory.join(&encoded.file_name)),
                    sub_directory: image.sub_directory.clone(),
                });
            }
            Some(Err(err)) => record_failure(&mut result, cell, &err),
        }
    }

    result
}

/// Result for an image whose variant names belong to `owner`, an earlier
/// source in the same directory. Every cell fails and nothing is written.
pub fn colliding_image(image: &DiscoveredImage, spec: &VariantSpec, owner: &Path) -> ImageResult {
    let mut result = empty_result(image);
    let err = VariantCellError::NameCollision(owner.display().to_string());
    fail_every_cell(&mut result, spec, &err);
    result
}

fn empty_result(image: &DiscoveredImage) -> ImageResult {
    ImageResult {
        source_relative_path: image.relative_path.clone(),
        sub_directory: image.sub_directory.clone(),
        dimensions: None,
        variants: Vec::new(),
        failures: Vec::new(),
    }
}

fn record_failure(result: &mut ImageResult, cell: Cell, err: &VariantCellError) {
    warn!(
        image = %result.source_relative_path.display(),
        width = cell.target_width,
        format = %cell.format,
        error = %err,
        "variant failed"
    );
    result.failures.push(CellFailure {
        target_width: cell.target_width,
        format: cell.format,
        error: err.to_string(),
    });
}

fn fail_every_cell(result: &mut ImageResult, spec: &VariantSpec, err: &VariantCellError) {
    for cell in spec.cells() {
        record_failure(result, cell, err);
    }
}
