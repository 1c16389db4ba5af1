//! Texture processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and transform.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): `image` for decoding
//! and resampling, `image_dds` for BCn encoding and DDS decoding.

use super::params::{TargetFormat, TransformParams};
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
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for texture processing backends.
///
/// Implementations must be `Sync`: the worker pool shares one backend across
/// all threads.
pub trait ImageBackend: Sync {
    /// Get texture dimensions without a full decode where possible.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode, scale and encode one texture. Returns the format actually
    /// written, which differs from `params.requested` when the source has
    /// alpha and the requested format cannot store it.
    fn transform(&self, params: &TransformParams) -> Result<TargetFormat, BackendError>;
}
