//! `<picture>` markup generation.
//!
//! Final stage of the pipeline. Turns the ordered [`ImageResult`]s of a run
//! into one HTML fragment: a file-level header comment followed by one block
//! per image, blocks separated by blank lines, in discovery order.
//!
//! ## Block shape
//!
//! ```html
//! <!-- photos/a.jpg -->
//! <picture><source type="image/webp" srcset="photos/a-400w.webp 400w,
//! photos/a-800w.webp 800w,
//! photos/a-1200w.webp 1200w" sizes="(max-width: 400px) 400px, (max-width: 800px) 800px, 1200px">
//! <source type="image/jpeg" ...><img src="photos/a-800w.jpeg" alt="a" width="800" height="600"
//! sizes="..." loading="lazy" decoding="async"></picture>
//! ```
//!
//! (Line breaks after `>` added here for readability; maud renders tags
//! back to back.)
//!
//! - One `<source>` per format that has at least one variant, most preferred
//!   format first. Entries use the actual encoded width as descriptor and are
//!   ordered by ascending width; cells whose actual width repeats an earlier
//!   one (narrow sources re-encoded at native size) are dropped so
//!   descriptors stay unique.
//! - The `<img>` fallback is picked from variants that actually exist, see
//!   [`select_fallback`].
//! - An image with no variants gets a comment-only block.
//!
//! Output depends only on the results and configuration, so an unchanged
//! input tree renders byte-identical markup.

use crate::config::{MarkupConfig, VariantSpec};
use crate::imaging::OutputFormat;
use crate::naming::display_title;
use crate::report::{ImageResult, MaterializedVariant, write_atomic};
use maud::{Markup, html};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Cannot write markup to {path}: {source}")]
pub struct MarkupWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Render the whole fragment for a run.
pub fn build_markup(results: &[ImageResult], spec: &VariantSpec, config: &MarkupConfig) -> String {
    let mut out = format!(
        "<!-- srcsetter: {} images, widths {}, formats {} -->\n",
        results.len(),
        spec.widths()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("/"),
        spec.formats()
            .iter()
            .map(|f| f.format.name())
            .collect::<Vec<_>>()
            .join("/"),
    );
    for result in results {
        out.push('\n');
        out.push_str(&render_image_block(result, spec, config));
        out.push('\n');
    }
    out
}

/// Render one image: a source comment plus its `<picture>` element.
pub fn render_image_block(result: &ImageResult, spec: &VariantSpec, config: &MarkupConfig) -> String {
    let label = comment_text(&result.source_relative_path.display().to_string());
    let Some(fallback) = select_fallback(result, spec) else {
        return format!("<!-- {label} (no variants) -->");
    };

    let sizes = sizes_attr(spec);
    let alt = alt_text(&result.source_relative_path);
    let sources: Vec<(OutputFormat, String)> = spec
        .formats()
        .iter()
        .filter_map(|f| {
            let srcset = srcset(result, f.format, &config.url_prefix)?;
            Some((f.format, srcset))
        })
        .collect();

    let picture: Markup = html! {
        picture {
            @for (format, srcset) in &sources {
                source type=(format.mime_type()) srcset=(srcset) sizes=(sizes);
            }
            img src={ (config.url_prefix) (fallback.output_relative_path) }
                alt=(alt)
                width=(fallback.width)
                height=(fallback.height)
                sizes=(sizes)
                loading="lazy"
                decoding="async";
        }
    };

    format!("<!-- {label} -->\n{}", picture.into_string())
}

/// Pick the `<img>` fallback from the variants that were written.
///
/// Preference: the middle configured width in the last configured format;
/// otherwise the nearest width in that format (ties go to the narrower);
/// otherwise the same search in each earlier format, last to first.
/// `None` only when the image has no variants at all.
pub fn select_fallback<'a>(
    result: &'a ImageResult,
    spec: &VariantSpec,
) -> Option<&'a MaterializedVariant> {
    let target = spec.default_width();
    let earlier = spec.formats().iter().rev().skip(1).map(|f| f.format);
    std::iter::once(spec.fallback_format())
        .chain(earlier)
        .find_map(|format| {
            result
                .variants_for(format)
                .min_by_key(|v| (v.target_width.abs_diff(target), v.target_width))
        })
}

/// `srcset` value for one format, or `None` if the format has no variants.
fn srcset(result: &ImageResult, format: OutputFormat, url_prefix: &str) -> Option<String> {
    let mut variants: Vec<&MaterializedVariant> = result.variants_for(format).collect();
    if variants.is_empty() {
        return None;
    }
    variants.sort_by_key(|v| v.target_width);

    let mut seen_widths = Vec::new();
    let entries: Vec<String> = variants
        .into_iter()
        .filter(|v| {
            if seen_widths.contains(&v.width) {
                return false;
            }
            seen_widths.push(v.width);
            true
        })
        .map(|v| format!("{url_prefix}{} {}w", v.output_relative_path, v.width))
        .collect();
    Some(entries.join(",\n"))
}

/// `sizes` hint using the configured widths as breakpoints:
/// `(max-width: 400px) 400px, (max-width: 800px) 800px, 1200px`.
pub fn sizes_attr(spec: &VariantSpec) -> String {
    let widths = spec.widths();
    let (last, rest) = match widths.split_last() {
        Some(split) => split,
        None => return String::new(),
    };
    rest.iter()
        .map(|w| format!("(max-width: {w}px) {w}px"))
        .chain(std::iter::once(format!("{last}px")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn alt_text(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    display_title(&stem)
}

/// `--` may not appear inside an HTML comment.
fn comment_text(text: &str) -> String {
    text.replace("--", "- -")
}

/// Write the fragment to `path`, replacing any previous version atomically.
pub fn write_markup(path: &Path, contents: &str) -> Result<(), MarkupWriteError> {
    let result = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
    .and_then(|_| write_atomic(path, contents.as_bytes()));

    result.map_err(|source| MarkupWriteError {
        path: path.to_path_buf(),
        source,
    })
}
