//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the narrow interface the pipeline uses for
//! pixel work: read a source's intrinsic dimensions, and produce the encoded
//! bytes of one variant. Writing those bytes to disk is the caller's job, so
//! codec failures and filesystem failures stay distinguishable.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) on the `image` crate.

use super::params::EncodeParams;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image codec backends.
///
/// Implementations must be `Sync`: the planner calls one shared backend from
/// every worker thread.
pub trait ImageBackend: Sync {
    /// Get the intrinsic dimensions of a source image.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the source, resample to the requested dimensions if they differ,
    /// and return the encoded bytes.
    fn encode(&self, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}
