//! Run configuration.
//!
//! Handles loading, validating, and merging `srcsetter.toml`. Stock defaults
//! are overridden by the user's file; CLI flags override both for the input
//! and output roots.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! input_root = "images"          # Directory scanned for source images
//! output_root = "dist/images"    # Variants land here, mirroring sub-directories
//!
//! [variants]
//! widths = [400, 800, 1200]      # Target widths in pixels
//! formats = [                     # First = most preferred, last = fallback
//!   { format = "webp", quality = 80 },
//!   { format = "jpeg", quality = 85 },
//! ]
//!
//! [markup]
//! file_name = "pictures.html"    # Fragment file inside output_root
//! url_prefix = ""                # Prepended to every variant reference
//! report_file = "variants.json"  # JSON run report; "" disables it
//!
//! [processing]
//! max_processes = 4              # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: tables merge key by key, arrays replace the
//! default wholesale.
//!
//! ```toml
//! [variants]
//! widths = [320, 640, 960, 1280]
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## The variant spec
//!
//! [`Config::variant_spec`] turns the `[variants]` table into a
//! [`VariantSpec`], an immutable value handed to the pipeline entry points.
//! Nothing in the pipeline reads configuration from global state, so tests
//! and concurrent runs can each use their own spec.

use crate::imaging::{Cell, OutputFormat, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up by [`load_config`].
pub const CONFIG_FILENAME: &str = "srcsetter.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Run configuration loaded from `srcsetter.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory scanned recursively for source images.
    pub input_root: PathBuf,
    /// Directory the variants, markup fragment, and report are written to.
    pub output_root: PathBuf,
    /// Target widths and output formats.
    pub variants: VariantsConfig,
    /// Markup fragment settings.
    pub markup: MarkupConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("images"),
            output_root: PathBuf::from("dist/images"),
            variants: VariantsConfig::default(),
            markup: MarkupConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.variant_spec()?;
        if self.markup.file_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "markup.file_name must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if normalized_root(&self.input_root) == normalized_root(&self.output_root) {
            return Err(ConfigError::Validation(
                "output_root must differ from input_root".into(),
            ));
        }
        Ok(())
    }

    /// Build the immutable variant spec from the `[variants]` table.
    pub fn variant_spec(&self) -> Result<VariantSpec, ConfigError> {
        let formats = self
            .variants
            .formats
            .iter()
            .map(|entry| {
                if entry.quality == 0 || entry.quality > 100 {
                    return Err(ConfigError::Validation(format!(
                        "variants.formats: quality for {} must be 1-100, got {}",
                        entry.format, entry.quality
                    )));
                }
                Ok(FormatSpec {
                    format: entry.format,
                    quality: Quality::new(entry.quality),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        VariantSpec::new(self.variants.widths.clone(), formats)
    }
}

/// Target widths and output formats, as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariantsConfig {
    /// Pixel widths to generate for every source image.
    pub widths: Vec<u32>,
    /// Output formats, most preferred first. The last one is the fallback.
    pub formats: Vec<FormatEntry>,
}

impl Default for VariantsConfig {
    fn default() -> Self {
        Self {
            widths: vec![400, 800, 1200],
            formats: vec![
                FormatEntry {
                    format: OutputFormat::Webp,
                    quality: 80,
                },
                FormatEntry {
                    format: OutputFormat::Jpeg,
                    quality: 85,
                },
            ],
        }
    }
}

/// One `{ format, quality }` entry of `variants.formats`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatEntry {
    pub format: OutputFormat,
    #[serde(default = "default_quality")]
    pub quality: u32,
}

fn default_quality() -> u32 {
    Quality::default().value()
}

/// Markup fragment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupConfig {
    /// File name of the fragment, relative to the output root.
    pub file_name: String,
    /// Prefix prepended to every variant reference (e.g. `/static/img/`).
    pub url_prefix: String,
    /// File name of the JSON run report, relative to the output root.
    /// Empty disables the report.
    pub report_file: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            file_name: "pictures.html".to_string(),
            url_prefix: String::new(),
            report_file: "variants.json".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve `.`, `..` and symlinks for an existing path; a path that does not
/// exist yet is made absolute against the working directory instead.
fn normalized_root(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Variant spec
// =============================================================================

/// An output format paired with its fixed encoding quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatSpec {
    pub format: OutputFormat,
    pub quality: Quality,
}

/// The width × format matrix every source image is planned against.
///
/// Invariants, enforced by [`VariantSpec::new`]:
/// - `widths` is non-empty, strictly ascending, and has no zero
/// - `formats` is non-empty with no format listed twice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSpec {
    widths: Vec<u32>,
    formats: Vec<FormatSpec>,
}

impl VariantSpec {
    /// Validate and normalize: widths are sorted ascending and de-duplicated.
    pub fn new(mut widths: Vec<u32>, formats: Vec<FormatSpec>) -> Result<Self, ConfigError> {
        if widths.is_empty() {
            return Err(ConfigError::Validation(
                "variants.widths must not be empty".into(),
            ));
        }
        if widths.contains(&0) {
            return Err(ConfigError::Validation(
                "variants.widths must be positive".into(),
            ));
        }
        if formats.is_empty() {
            return Err(ConfigError::Validation(
                "variants.formats must not be empty".into(),
            ));
        }
        for (i, spec) in formats.iter().enumerate() {
            if formats[..i].iter().any(|earlier| earlier.format == spec.format) {
                return Err(ConfigError::Validation(format!(
                    "variants.formats lists {} more than once",
                    spec.format
                )));
            }
        }

        widths.sort_unstable();
        widths.dedup();
        Ok(Self { widths, formats })
    }

    /// Target widths, ascending.
    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    /// Output formats, most preferred first.
    pub fn formats(&self) -> &[FormatSpec] {
        &self.formats
    }

    /// The canonical fallback width: the middle configured width.
    ///
    /// `[400, 800, 1200]` → 800; with an even count the upper middle wins.
    pub fn default_width(&self) -> u32 {
        self.widths[self.widths.len() / 2]
    }

    /// The canonical fallback format: the last configured format.
    pub fn fallback_format(&self) -> OutputFormat {
        self.formats[self.formats.len() - 1].format
    }

    /// Every cell of the matrix, widths outer and formats inner.
    pub fn cells(&self) -> Vec<Cell> {
        self.widths
            .iter()
            .flat_map(|&target_width| {
                self.formats.iter().map(move |spec| Cell {
                    target_width,
                    format: spec.format,
                    quality: spec.quality,
                })
            })
            .collect()
    }

    pub fn cell_count(&self) -> usize {
        self.widths.len() * self.formats.len()
    }
}

impl Default for VariantSpec {
    fn default() -> Self {
        let defaults = VariantsConfig::default();
        Self {
            widths: defaults.widths,
            formats: defaults
                .formats
                .iter()
                .map(|entry| FormatSpec {
                    format: entry.format,
                    quality: Quality::new(entry.quality),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay (including arrays) replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(value)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load an explicit config file on top of stock defaults.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let overlay = load_raw_config(path)?;
    resolve_config(stock_defaults_value(), Some(overlay))
}

/// Load `srcsetter.toml` from `dir`, or stock defaults when it is absent.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let path = dir.join(CONFIG_FILENAME);
    if !path.exists() {
        return resolve_config(stock_defaults_value(), None);
    }
    load_config_file(&path)
}

/// Returns a fully-commented stock `srcsetter.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# srcsetter configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Directory scanned (recursively) for jpg, jpeg, png, gif, tiff and webp files.
input_root = "images"

# Directory the variants are written to. Sub-directories of the input root
# are mirrored here. Must differ from input_root.
output_root = "dist/images"

# ---------------------------------------------------------------------------
# Variant matrix
# ---------------------------------------------------------------------------
[variants]
# Target widths in pixels. Sources narrower than a width are re-encoded at
# their native size; nothing is ever upscaled.
widths = [400, 800, 1200]

# Output formats, most preferred first. The last entry is the fallback used
# for the <img> element. Available: webp, jpeg, png, avif.
# quality (1-100) applies to jpeg and avif; webp and png are lossless.
formats = [
  { format = "webp", quality = 80 },
  { format = "jpeg", quality = 85 },
]

# ---------------------------------------------------------------------------
# Markup
# ---------------------------------------------------------------------------
[markup]
# Fragment file with one <picture> block per image, inside output_root.
file_name = "pictures.html"

# Prepended to every variant reference, e.g. "/static/images/".
url_prefix = ""

# JSON report of every materialized variant and failed cell, inside
# output_root. Set to "" to skip it.
report_file = "variants.json"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
