//! Pure calculation functions for variant dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the output dimensions of a variant for one target width.
///
/// The source is fitted inside a box of `target_width` × unbounded height,
/// preserving aspect ratio. Sources that are already at or below the target
/// width pass through at native resolution: a variant is never upscaled.
///
/// # Arguments
/// * `original` - Source image dimensions (width, height)
/// * `target_width` - Configured width for this cell
///
/// # Returns
/// * `(width, height)` - Dimensions to encode at; `width <= original.0` always holds
///
/// # Examples
/// ```
/// # use srcsetter::imaging::calculate_variant_dimensions;
/// // 2000x1500 at 800 → 800x600
/// assert_eq!(calculate_variant_dimensions((2000, 1500), 800), (800, 600));
///
/// // 300x200 at 800 → unchanged
/// assert_eq!(calculate_variant_dimensions((300, 200), 800), (300, 200));
/// ```
pub fn calculate_variant_dimensions(original: (u32, u32), target_width: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;

    if orig_w <= target_width {
        return (orig_w, orig_h);
    }

    let ratio = target_width as f64 / orig_w as f64;
    let height = (orig_h as f64 * ratio).round().max(1.0) as u32;
    (target_width, height)
}
