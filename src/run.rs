//! Pipeline orchestration.
//!
//! ```text
//! discover ──► plan_image (per image, rayon pool) ──► build_markup ──► write
//!                 └─ cells in parallel                     └─ variants.json
//! ```
//!
//! [`run`] processes a whole input root; [`run_single`] processes one named
//! file and returns its markup block instead of writing a fragment.
//!
//! Images fan out over a per-run rayon pool sized by
//! [`effective_threads`]. Results are collected by discovery index, so the
//! markup order never depends on which image finished first.
//!
//! Sources in one directory that share a stem would overwrite each other's
//! variants. The first in discovery order keeps the names; the rest are
//! reported with every cell failed.
//!
//! Only an invalid config, a failed discovery, a failed markup/report write, or cancellation
//! end a run with an error. Cell failures are recorded in the report.

use crate::config::{Config, ConfigError, effective_threads};
use crate::discover::{DiscoveredImage, DiscoveryError, discover_excluding, is_image};
use crate::imaging::{ImageBackend, RustBackend};
use crate::markup::{MarkupWriteError, build_markup, render_image_block, write_markup};
use crate::plan::{colliding_image, plan_image};
use crate::report::{ImageResult, RunReport, write_report};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    MarkupWrite(#[from] MarkupWriteError),
    #[error("Cannot write report to {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Source image not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("Not a supported image file: {0}")]
    UnsupportedInput(PathBuf),
    #[error("Run cancelled")]
    Cancelled,
}

/// Cooperative cancellation shared between the caller and the workers.
///
/// Once cancelled, no new image or cell is started; cells already encoding
/// run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress notifications, sent while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Discovery finished.
    Discovered { count: usize },
    /// One image finished planning. `index` is its discovery position;
    /// events arrive in completion order.
    ImagePlanned {
        index: usize,
        total: usize,
        source: PathBuf,
        variants: usize,
        failures: usize,
    },
}

/// Process every image under `config.input_root` with the production codec.
pub fn run(
    config: &Config,
    events: Option<Sender<RunEvent>>,
    cancel: &CancelToken,
) -> Result<RunReport, RunError> {
    run_with_backend(&RustBackend::new(), config, events, cancel)
}

/// Process every image under `config.input_root` using a specific backend
/// (allows testing with mock).
pub fn run_with_backend(
    backend: &impl ImageBackend,
    config: &Config,
    events: Option<Sender<RunEvent>>,
    cancel: &CancelToken,
) -> Result<RunReport, RunError> {
    config.validate()?;
    let spec = config.variant_spec()?;
    info!(
        input = %config.input_root.display(),
        output = %config.output_root.display(),
        widths = ?spec.widths(),
        "starting run"
    );

    let images = discover_excluding(&config.input_root, &[config.output_root.as_path()])?;
    notify(&events, RunEvent::Discovered {
        count: images.len(),
    });

    let mut report = RunReport {
        output_root: config.output_root.clone(),
        markup_path: None,
        images: Vec::new(),
    };

    if images.is_empty() {
        info!(input = %config.input_root.display(), "no images found, nothing to do");
        return Ok(report);
    }
    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }

    let threads = effective_threads(&config.processing);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    debug!(threads, images = images.len(), "planning");

    let owners = name_owners(&images);
    let total = images.len();
    let planned: Vec<Option<ImageResult>> = pool.install(|| {
        images
            .par_iter()
            .enumerate()
            .map(|(index, image)| {
                if cancel.is_cancelled() {
                    return None;
                }
                let result = match &owners[index] {
                    Some(owner) => colliding_image(image, &spec, owner),
                    None => plan_image(backend, image, &spec, &config.output_root, cancel),
                };
                debug!(
                    image = %image.relative_path.display(),
                    variants = result.variants.len(),
                    failures = result.failures.len(),
                    "image planned"
                );
                notify(&events, RunEvent::ImagePlanned {
                    index,
                    total,
                    source: image.relative_path.clone(),
                    variants: result.variants.len(),
                    failures: result.failures.len(),
                });
                Some(result)
            })
            .collect()
    });

    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }
    report.images = planned.into_iter().flatten().collect();

    let markup = build_markup(&report.images, &spec, &config.markup);
    let markup_path = config.output_root.join(&config.markup.file_name);
    write_markup(&markup_path, &markup)?;
    report.markup_path = Some(markup_path);

    if !config.markup.report_file.is_empty() {
        let path = config.output_root.join(&config.markup.report_file);
        write_report(&report, &path).map_err(|source| RunError::ReportWrite { path, source })?;
    }

    info!(
        output = %config.output_root.display(),
        summary = %report.summary(),
        "run finished"
    );
    Ok(report)
}

/// Outcome of processing one explicitly named file.
#[derive(Debug, Clone)]
pub struct SingleImage {
    pub result: ImageResult,
    /// The `<picture>` block for this image alone.
    pub markup: String,
}

/// Process one file into `config.output_root` with the production codec.
pub fn run_single(config: &Config, path: &Path, cancel: &CancelToken) -> Result<SingleImage, RunError> {
    run_single_with_backend(&RustBackend::new(), config, path, cancel)
}

/// Process one file using a specific backend. Skips discovery; the file's
/// variants land directly in the output root.
pub fn run_single_with_backend(
    backend: &impl ImageBackend,
    config: &Config,
    path: &Path,
    cancel: &CancelToken,
) -> Result<SingleImage, RunError> {
    config.validate()?;
    let spec = config.variant_spec()?;
    if !path.exists() {
        return Err(RunError::SourceNotFound(path.to_path_buf()));
    }
    if !path.is_file() || !is_image(path) {
        return Err(RunError::UnsupportedInput(path.to_path_buf()));
    }
    let image = DiscoveredImage::single(path)
        .ok_or_else(|| RunError::UnsupportedInput(path.to_path_buf()))?;
    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }

    info!(image = %path.display(), output = %config.output_root.display(), "processing single image");
    let result = plan_image(backend, &image, &spec, &config.output_root, cancel);
    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }

    let markup = render_image_block(&result, &spec, &config.markup);
    Ok(SingleImage { result, markup })
}

/// For each image, the earlier image (if any) in the same sub-directory with
/// the same stem, whose variant file names it would overwrite.
fn name_owners(images: &[DiscoveredImage]) -> Vec<Option<PathBuf>> {
    let mut claimed: HashMap<(PathBuf, String), &Path> = HashMap::new();
    images
        .iter()
        .map(|image| {
            let key = (image.sub_directory.clone(), image.stem());
            match claimed.get(&key) {
                Some(owner) => {
                    warn!(
                        image = %image.relative_path.display(),
                        owner = %owner.display(),
                        "variant names collide with an earlier image, skipping"
                    );
                    Some(owner.to_path_buf())
                }
                None => {
                    claimed.insert(key, &image.relative_path);
                    None
                }
            }
        })
        .collect()
}

fn notify(events: &Option<Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        // Receiver gone means nobody is listening; keep going.
        let _ = tx.send(event);
    }
}
