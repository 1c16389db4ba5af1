//! High-level texture operations.
//!
//! These functions combine calculations with backend execution.
//! They take a task, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::{TargetFormat, TransformParams, TransformTask};
use super::rust_backend::supported_input_extensions;
use std::path::Path;

/// Result type for texture operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Whether `path` has an extension the backend can decode.
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| e.eq_ignore_ascii_case(s))
        })
}

/// What a finished transform produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOutcome {
    pub original: Dimensions,
    pub output: Dimensions,
    pub requested: TargetFormat,
    pub format: TargetFormat,
}

impl TransformOutcome {
    /// The requested format was swapped for an alpha-capable one.
    pub fn upgraded(&self) -> bool {
        self.format != self.requested
    }
}

/// Plan a transform without executing it.
pub fn plan_transform(original: Dimensions, task: &TransformTask) -> TransformParams {
    let (width, height) = calculate_fit_dimensions(
        (original.width, original.height),
        task.settings.max_dimension.value(),
    );
    TransformParams {
        source: task.source.clone(),
        output: task.output.clone(),
        width,
        height,
        requested: task.settings.format,
    }
}

/// Identify, plan and run one transform.
pub fn transform_texture(
    backend: &impl ImageBackend,
    task: &TransformTask,
) -> Result<TransformOutcome> {
    let original = backend.identify(&task.source)?;
    let params = plan_transform(original, task);
    let format = backend.transform(&params)?;
    Ok(TransformOutcome {
        original,
        output: Dimensions {
            width: params.width,
            height: params.height,
        },
        requested: params.requested,
        format,
    })
}
