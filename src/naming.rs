//! File and reference naming shared by the planner and the markup builder.
//!
//! ## Variant files
//!
//! Every variant is written as `{stem}-{width}w.{format}` next to its siblings
//! in the mirrored sub-directory. The width is the *configured* target width,
//! so a 300px source still yields `logo-800w.webp` for the 800 cell. Names are
//! a pure function of (source, cell) and never depend on run order.
//!
//! ## Display titles
//!
//! Alt text is derived from the source stem. An optional `NNN-` ordering
//! prefix is stripped and dashes/underscores become spaces:
//! - `020-Golden-Gate` → "Golden Gate"
//! - `harbour_at_dusk` → "harbour at dusk"
//! - `001` → "001" (number-only stems keep the number)

use crate::imaging::OutputFormat;
use std::path::{Component, Path};

/// File name of one variant: `{stem}-{width}w.{format}`.
pub fn variant_file_name(stem: &str, target_width: u32, format: OutputFormat) -> String {
    format!("{}-{}w.{}", stem, target_width, format.name())
}

fn to_display(raw: &str) -> String {
    raw.replace(['-', '_'], " ").trim().to_string()
}

/// `020-Golden-Gate` → `Golden-Gate`. Stems without a numeric `NNN-`
/// prefix come back unchanged.
fn strip_order_prefix(stem: &str) -> &str {
    if let Some((prefix, rest)) = stem.split_once('-') {
        if prefix.parse::<u32>().is_ok() {
            return rest;
        }
    }
    stem
}

/// Human-readable title for alt text; falls back to the raw stem when the
/// title would be empty.
pub fn display_title(stem: &str) -> String {
    let title = to_display(strip_order_prefix(stem));
    if title.is_empty() {
        stem.to_string()
    } else {
        title
    }
}

/// Characters left as-is in a URL path segment (RFC 3986 unreserved).
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for &b in segment.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Render a relative filesystem path as a `/`-separated, percent-encoded URL path.
///
/// Spaces and commas would otherwise break `srcset` parsing.
pub fn url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(encode_segment(&s.to_string_lossy())),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
