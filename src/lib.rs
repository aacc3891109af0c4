//! # srcsetter
//!
//! Responsive image variant generator. Point it at a directory of images and
//! it writes every source at a set of target widths in a set of formats, then
//! emits one `<picture>` block per image that a page template can include.
//!
//! # Architecture: Discover → Plan → Markup
//!
//! ```text
//! 1. Discover   images/         →  Vec<DiscoveredImage>   (filtered, sorted walk)
//! 2. Plan       each image      →  dist/images/…          (width × format matrix)
//! 3. Markup     Vec<ImageResult> → pictures.html          (+ variants.json)
//! ```
//!
//! Everything a run needs is passed in as values: a [`config::Config`] and the
//! immutable [`config::VariantSpec`] derived from it. There is no global
//! state, so several runs (or tests) with different settings can share a
//! process.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`discover`] | Recursive, cycle-safe walk of the input root with an extension allow-list |
//! | [`plan`] | Fills the width × format matrix for one image; failures stay cell-scoped |
//! | [`markup`] | Renders `<picture>` blocks with Maud and writes the fragment |
//! | [`report`] | Per-image results, run totals, and the JSON report |
//! | [`run`] | Orchestrates a run over a rayon pool; single-image mode; cancellation |
//! | [`config`] | `srcsetter.toml` loading, validation, merging, and the variant spec |
//! | [`naming`] | Variant file names, alt text from stems, URL-safe references |
//! | [`imaging`] | Pure-Rust identify / resize / encode behind the `ImageBackend` trait |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Never Upscale
//!
//! A variant is never wider than its source. When a source is narrower than a
//! target width the cell is still written (so the file set is the same for
//! every image) but at native size, and the markup describes it by its real
//! width.
//!
//! ## Failures Are Cell-Scoped
//!
//! One unwritable file or one codec error costs exactly one (width, format)
//! cell. The image keeps its other variants, the run finishes, and the
//! summary lists what failed. Only an unreadable input root or an unwritable
//! markup file stops a run.
//!
//! ## Deterministic Output
//!
//! Discovery is sorted, results are collected by discovery index rather than
//! completion order, and the markup carries no timestamps. Running twice over
//! the same tree produces byte-identical markup.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, Lanczos3 resampling, and every encoder come from the `image`
//! crate. No ImageMagick, no system libraries: the binary is self-contained.

pub mod config;
pub mod discover;
pub mod imaging;
pub mod markup;
pub mod naming;
pub mod output;
pub mod plan;
pub mod report;
pub mod run;

#[cfg(test)]
pub(crate) mod test_helpers;
