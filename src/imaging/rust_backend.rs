//! Pure Rust texture backend.
//!
//! Everything is statically linked into the binary; no external converter is
//! spawned.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, TGA, JPEG) | `image` crate (pure Rust decoders) |
//! | Decode (DDS, any BCn) | `image_dds::image_from_dds` (top mip level) |
//! | Identify (DDS) | `ddsfile` header via `image_dds::ddsfile::Dds` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → DDS | `image_dds::dds_from_image`, full mip chain |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::resolve_format;
use super::params::{TargetFormat, TransformParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbaImage};
use image_dds::ddsfile::Dds;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Extensions with a decoder compiled in.
const SUPPORTED_EXTENSIONS: &[&str] = &["dds", "png", "tga", "jpg", "jpeg"];

/// Returns the set of texture file extensions that can be transformed.
pub fn supported_input_extensions() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using `image` + `image_dds`.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn is_dds(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("dds"))
}

fn read_dds(path: &Path) -> Result<Dds, BackendError> {
    let reader = BufReader::new(File::open(path)?);
    Dds::read(reader).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to read DDS {}: {}", path.display(), e))
    })
}

/// A decoded source and whether it carries meaningful alpha.
struct Decoded {
    image: DynamicImage,
    has_alpha: bool,
}

/// Load and decode a texture from disk.
///
/// DDS sources always decode to RGBA, so their alpha is judged from the
/// pixels. Other formats report alpha through their colour type.
fn load_image(path: &Path) -> Result<Decoded, BackendError> {
    if is_dds(path) {
        let dds = read_dds(path)?;
        let rgba = image_dds::image_from_dds(&dds, 0).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })?;
        let has_alpha = rgba.pixels().any(|p| p[3] < u8::MAX);
        return Ok(Decoded {
            image: DynamicImage::ImageRgba8(rgba),
            has_alpha,
        });
    }

    let image = ImageReader::open(path)
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })?;
    let has_alpha = image.color().has_alpha();
    Ok(Decoded { image, has_alpha })
}

fn dds_format(format: TargetFormat) -> image_dds::ImageFormat {
    match format {
        TargetFormat::Bc1 => image_dds::ImageFormat::BC1RgbaUnorm,
        TargetFormat::Bc2 => image_dds::ImageFormat::BC2RgbaUnorm,
        TargetFormat::Bc3 => image_dds::ImageFormat::BC3RgbaUnorm,
        TargetFormat::Bc7 => image_dds::ImageFormat::BC7RgbaUnorm,
    }
}

/// Block-compress `rgba` with a full mip chain and write it as DDS.
fn save_dds(rgba: &RgbaImage, path: &Path, format: TargetFormat) -> Result<(), BackendError> {
    let dds = image_dds::dds_from_image(
        rgba,
        dds_format(format),
        image_dds::Quality::Normal,
        image_dds::Mipmaps::GeneratedAutomatic,
    )
    .map_err(|e| BackendError::ProcessingFailed(format!("{format} encode failed: {e}")))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    dds.write(&mut writer)
        .map_err(|e| BackendError::ProcessingFailed(format!("DDS write failed: {e}")))?;
    writer.flush()?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if is_dds(path) {
            let dds = read_dds(path)?;
            return Ok(Dimensions {
                width: dds.get_width(),
                height: dds.get_height(),
            });
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn transform(&self, params: &TransformParams) -> Result<TargetFormat, BackendError> {
        let Decoded { image, has_alpha } = load_image(&params.source)?;
        let format = resolve_format(params.requested, has_alpha);

        let scaled = if image.width() == params.width && image.height() == params.height {
            image
        } else {
            image.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };

        save_dds(&scaled.to_rgba8(), &params.output, format)?;
        Ok(format)
    }
}
