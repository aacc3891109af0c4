//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns display lines, so the
//! wording is unit-tested; the `print_*` wrappers write those lines to
//! stdout. Diagnostics go through `tracing` on stderr instead, which keeps
//! stdout clean for the single-image markup block.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! images (2 images, 6 variants each)
//!     Widths: 400px, 800px, 1200px
//!     Formats: webp (lossless), jpeg q85
//! 001 b.png
//! 002 photos/a.jpg
//! ```
//!
//! ## Build
//!
//! ```text
//! Found 2 images
//! [1/2] b.png: 6 variants
//! [2/2] photos/a.jpg: 5 variants, 1 failed
//!
//! Failed cells
//! photos/a.jpg
//!     800w webp: write failed: Is a directory (os error 21)
//!
//! Markup: dist/images/pictures.html
//! Done: 2 images, 11 variants, 1 failed cells in 1 images → dist/images
//! ```

use crate::config::VariantSpec;
use crate::discover::DiscoveredImage;
use crate::report::RunReport;
use crate::run::RunEvent;
use std::path::Path;

/// `001 photos/a.jpg`: one-based position plus relative path.
fn image_line(position: usize, path: &Path) -> String {
    format!("{:03} {}", position, path.display())
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the discovery listing shown by `check`.
pub fn format_check(images: &[DiscoveredImage], root: &Path, spec: &VariantSpec) -> Vec<String> {
    if images.is_empty() {
        return vec![format!("{}: no images, nothing to do", root.display())];
    }

    let mut lines = vec![format!(
        "{} ({}, {} each)",
        root.display(),
        plural(images.len(), "image", "images"),
        plural(spec.cell_count(), "variant", "variants"),
    )];
    lines.push(format!("    Widths: {}", widths_line(spec)));
    lines.push(format!("    Formats: {}", formats_line(spec)));
    for (i, image) in images.iter().enumerate() {
        lines.push(image_line(i + 1, &image.relative_path));
    }
    lines
}

fn widths_line(spec: &VariantSpec) -> String {
    spec.widths()
        .iter()
        .map(|w| format!("{w}px"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `webp (lossless), jpeg q85`: quality only where the encoder uses it.
fn formats_line(spec: &VariantSpec) -> String {
    spec.formats()
        .iter()
        .map(|f| {
            if f.format.honours_quality() {
                format!("{} q{}", f.format, f.quality.value())
            } else {
                format!("{} (lossless)", f.format)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_check(images: &[DiscoveredImage], root: &Path, spec: &VariantSpec) {
    for line in format_check(images, root, spec) {
        println!("{}", line);
    }
}

// ============================================================================
// Build progress
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_run_event(event: &RunEvent) -> Vec<String> {
    match event {
        RunEvent::Discovered { count } => {
            vec![format!("Found {}", plural(*count, "image", "images"))]
        }
        RunEvent::ImagePlanned {
            index,
            total,
            source,
            variants,
            failures,
        } => {
            let mut line = format!(
                "[{}/{}] {}: {}",
                index + 1,
                total,
                source.display(),
                plural(*variants, "variant", "variants")
            );
            if *failures > 0 {
                line.push_str(&format!(", {} failed", failures));
            }
            vec![line]
        }
    }
}

// ============================================================================
// Build summary
// ============================================================================

/// Format the end-of-run summary: failed cells grouped by image, then the
/// written artifacts and totals.
pub fn format_summary(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();

    if report.image_count() == 0 {
        lines.push(format!(
            "Nothing to do: 0 images, 0 variants \u{2192} {}",
            report.output_root.display()
        ));
        return lines;
    }

    let incomplete: Vec<_> = report.images.iter().filter(|i| !i.is_complete()).collect();
    if !incomplete.is_empty() {
        lines.push(String::new());
        lines.push("Failed cells".to_string());
        for image in incomplete {
            lines.push(image.source_relative_path.display().to_string());
            for failure in &image.failures {
                lines.push(format!(
                    "    {}w {}: {}",
                    failure.target_width, failure.format, failure.error
                ));
            }
        }
    }

    lines.push(String::new());
    if let Some(path) = &report.markup_path {
        lines.push(format!("Markup: {}", path.display()));
    }
    lines.push(format!(
        "Done: {} \u{2192} {}",
        report.summary(),
        report.output_root.display()
    ));
    lines
}

pub fn print_summary(report: &RunReport) {
    for line in format_summary(report) {
        println!("{}", line);
    }
}
