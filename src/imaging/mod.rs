//! Image codec access, pure Rust on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | Lanczos3, only ever downward |
//! | **Encode** | JPEG, PNG, WebP (lossless), AVIF (rav1e) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: One planning cell at a time: calculations + backend + write

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::calculate_variant_dimensions;
pub use operations::{EncodedVariant, encode_variant, get_dimensions, plan_variant};
pub use params::{Cell, EncodeParams, OutputFormat, Quality};
pub use rust_backend::RustBackend;
