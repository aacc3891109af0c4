//! Parameter types for image operations.
//!
//! These structs describe *what* to encode, not *how*. They are the interface
//! between the [`operations`](super::operations) module (which decides what
//! each cell of the width × format matrix becomes) and the
//! [`backend`](super::backend) (which does the pixel work). Keeping them plain
//! data lets the planner run against a mock backend in tests.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`] — The encodings a variant can be written in.
//! - [`Cell`] — One target width paired with one format and its quality.
//! - [`EncodeParams`] — Full specification for one encode: source, format, output dimensions, quality.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Output encodings a variant can be materialized in.
///
/// The lowercase name doubles as the file extension, so a 400px WebP of
/// `sunset.jpg` is written as `sunset-400w.webp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Jpeg,
    Png,
    Avif,
}

impl OutputFormat {
    /// Lowercase name, also used as the file extension.
    pub fn name(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Avif => "avif",
        }
    }

    /// MIME type for the `type` attribute of a `<source>` element.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Webp => "image/webp",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Avif => "image/avif",
        }
    }

    /// Whether the encoder in [`RustBackend`](super::RustBackend) honours the quality setting.
    ///
    /// The pure-Rust WebP encoder only writes lossless files.
    pub fn honours_quality(self) -> bool {
        matches!(self, Self::Jpeg | Self::Avif)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One (width, format) combination of the planning matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub target_width: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Parameters for encoding one variant.
///
/// `width`/`height` are the final pixel dimensions. When they equal the
/// source dimensions the backend re-encodes without resampling.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub source: PathBuf,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}
