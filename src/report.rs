//! Run results.
//!
//! [`ImageResult`] is what the planner returns for one source image: the
//! variants that materialized plus one [`CellFailure`] per cell that did not.
//! [`RunReport`] collects those results in discovery order and is the single
//! input of the markup builder and the JSON report.
//!
//! ## JSON report
//!
//! When `markup.report_file` is set, the whole report is written next to the
//! fragment as pretty-printed JSON:
//!
//! ```json
//! {
//!   "output_root": "dist/images",
//!   "markup_path": "dist/images/pictures.html",
//!   "images": [
//!     {
//!       "source_relative_path": "photos/a.jpg",
//!       "sub_directory": "photos",
//!       "dimensions": { "width": 2000, "height": 1500 },
//!       "variants": [
//!         { "target_width": 400, "width": 400, "height": 300, "format": "webp",
//!           "output_relative_path": "photos/a-400w.webp", ... }
//!       ],
//!       "failures": []
//!     }
//!   ]
//! }
//! ```

use crate::imaging::{Dimensions, OutputFormat};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A variant file that was written successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedVariant {
    pub source_relative_path: PathBuf,
    /// The configured width of the cell; also the `-{w}w` in the file name.
    pub target_width: u32,
    /// Actual pixel width written. Equals `target_width` unless the source
    /// was narrower.
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// Reference relative to the output root, `/`-separated and URL-encoded.
    pub output_relative_path: String,
    pub sub_directory: PathBuf,
}

/// A (width, format) cell that produced no file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellFailure {
    pub target_width: u32,
    pub format: OutputFormat,
    pub error: String,
}

/// Everything the planner produced for one source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageResult {
    pub source_relative_path: PathBuf,
    pub sub_directory: PathBuf,
    /// `None` when the source could not be identified.
    pub dimensions: Option<Dimensions>,
    /// Materialized variants, widths ascending then formats in config order.
    pub variants: Vec<MaterializedVariant>,
    pub failures: Vec<CellFailure>,
}

impl ImageResult {
    /// Variants of one format, in ascending target width.
    pub fn variants_for(&self, format: OutputFormat) -> impl Iterator<Item = &MaterializedVariant> {
        self.variants.iter().filter(move |v| v.format == format)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Results of a whole run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub output_root: PathBuf,
    /// Where the fragment was written; `None` when nothing was written.
    pub markup_path: Option<PathBuf>,
    pub images: Vec<ImageResult>,
}

impl RunReport {
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn variant_count(&self) -> usize {
        self.images.iter().map(|i| i.variants.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.images.iter().map(|i| i.failures.len()).sum()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            images: self.image_count(),
            variants: self.variant_count(),
            failures: self.failure_count(),
            incomplete_images: self.images.iter().filter(|i| !i.is_complete()).count(),
        }
    }
}

/// Counts for the end-of-run line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub images: usize,
    pub variants: usize,
    pub failures: usize,
    pub incomplete_images: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} images, {} variants", self.images, self.variants)?;
        if self.failures > 0 {
            write!(
                f,
                ", {} failed cells in {} images",
                self.failures, self.incomplete_images
            )?;
        }
        Ok(())
    }
}

/// Write `contents` to `path` through a sibling temp file and a rename, so a
/// reader never sees a half-written file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

/// Serialize the report as pretty JSON to `path`.
pub fn write_report(report: &RunReport, path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    write_atomic(path, json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn variant(target_width: u32, width: u32, format: OutputFormat) -> MaterializedVariant {
        MaterializedVariant {
            source_relative_path: PathBuf::from("a.jpg"),
            target_width,
            width,
            height: width * 3 / 4,
            format,
            output_relative_path: format!("a-{target_width}w.{}", format.name()),
            sub_directory: PathBuf::new(),
        }
    }

    fn image(variants: Vec<MaterializedVariant>, failures: Vec<CellFailure>) -> ImageResult {
        ImageResult {
            source_relative_path: PathBuf::from("a.jpg"),
            sub_directory: PathBuf::new(),
            dimensions: Some(Dimensions {
                width: 2000,
                height: 1500,
            }),
            variants,
            failures,
        }
    }

    fn failure(target_width: u32, format: OutputFormat) -> CellFailure {
        CellFailure {
            target_width,
            format,
            error: "boom".into(),
        }
    }

    #[test]
    fn variants_for_filters_by_format() {
        let result = image(
            vec![
                variant(400, 400, OutputFormat::Webp),
                variant(400, 400, OutputFormat::Jpeg),
                variant(800, 800, OutputFormat::Webp),
            ],
            vec![],
        );
        let widths: Vec<u32> = result
            .variants_for(OutputFormat::Webp)
            .map(|v| v.target_width)
            .collect();
        assert_eq!(widths, vec![400, 800]);
    }

    #[test]
    fn counts_sum_across_images() {
        let report = RunReport {
            output_root: PathBuf::from("out"),
            markup_path: None,
            images: vec![
                image(vec![variant(400, 400, OutputFormat::Jpeg)], vec![]),
                image(
                    vec![variant(400, 400, OutputFormat::Webp)],
                    vec![failure(800, OutputFormat::Webp), failure(800, OutputFormat::Jpeg)],
                ),
            ],
        };

        assert_eq!(report.image_count(), 2);
        assert_eq!(report.variant_count(), 2);
        assert_eq!(report.failure_count(), 2);
        assert_eq!(report.summary().incomplete_images, 1);
    }

    #[test]
    fn summary_display_clean_run() {
        let summary = RunSummary {
            images: 2,
            variants: 12,
            failures: 0,
            incomplete_images: 0,
        };
        assert_eq!(summary.to_string(), "2 images, 12 variants");
    }

    #[test]
    fn summary_display_with_failures() {
        let summary = RunSummary {
            images: 2,
            variants: 11,
            failures: 1,
            incomplete_images: 1,
        };
        assert_eq!(
            summary.to_string(),
            "2 images, 11 variants, 1 failed cells in 1 images"
        );
    }

    #[test]
    fn write_report_emits_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("variants.json");
        let report = RunReport {
            output_root: PathBuf::from("out"),
            markup_path: Some(PathBuf::from("out/pictures.html")),
            images: vec![image(
                vec![variant(400, 400, OutputFormat::Webp)],
                vec![failure(800, OutputFormat::Webp)],
            )],
        };

        write_report(&report, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["images"][0]["variants"][0]["format"], "webp");
        assert_eq!(value["images"][0]["variants"][0]["output_relative_path"], "a-400w.webp");
        assert_eq!(value["images"][0]["failures"][0]["target_width"], 800);
        assert_eq!(value["images"][0]["dimensions"]["width"], 2000);
    }

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.html");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.html")]);
    }
}
