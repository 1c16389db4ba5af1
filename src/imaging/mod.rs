//! Texture processing: pure Rust, no external converter.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions`, DDS header |
//! | **Decode** | `image` (PNG/TGA/JPEG), `image_dds` (DDS) |
//! | **Resize** | Lanczos3 to fit within the max dimension |
//! | **Encode** | `image_dds` BC1/BC2/BC3/BC7 with mipmaps |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math and format policy (unit testable)
//! - **Parameters**: Data structures describing texture operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_fit_dimensions, resolve_format};
pub use operations::{TransformOutcome, is_supported_input, plan_transform, transform_texture};
pub use params::{
    MAX_DIMENSION_PRESETS, MaxDimension, TargetFormat, TransformParams, TransformSettings,
    TransformTask,
};
pub use rust_backend::RustBackend;
