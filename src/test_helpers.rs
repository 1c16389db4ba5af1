//! Shared test utilities for the texproc test suite.
//!
//! Provides synthetic texture writers, game-tree fixture builders and an
//! in-memory [`ArchiveTool`] so scan, stage and install tests never spawn a
//! real archive CLI.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_loose(tmp.path(), "Native", "armors/a.dds", b"original");
//! let pkg = write_package_dir(tmp.path(), "Native");
//! let tool = MockArchiveTool::new().with_asset(&pkg, "items/b.dds", b"packed");
//! ```

use crate::archive::{ArchiveError, ArchiveTool};
use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// =========================================================================
// Synthetic textures
// =========================================================================

/// Write an opaque RGB PNG with a gradient.
pub fn write_png(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    encode_png(path, img.as_raw(), width, height, image::ExtendedColorType::Rgb8);
}

/// Write an RGBA PNG whose alpha varies across the image.
pub fn write_rgba_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 64, ((x + y) % 256) as u8])
    });
    encode_png(path, img.as_raw(), width, height, image::ExtendedColorType::Rgba8);
}

fn encode_png(path: &Path, raw: &[u8], width: u32, height: u32, ty: image::ExtendedColorType) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::png::PngEncoder::new(writer)
        .write_image(raw, width, height, ty)
        .unwrap();
}

/// Write a BC3 DDS. `translucent` sets every pixel's alpha to half.
pub fn write_dds(path: &Path, width: u32, height: u32, translucent: bool) {
    let alpha = if translucent { 128 } else { 255 };
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 4 % 256) as u8, (y * 4 % 256) as u8, 200, alpha])
    });
    let dds = image_dds::dds_from_image(
        &img,
        image_dds::ImageFormat::BC3RgbaUnorm,
        image_dds::Quality::Fast,
        image_dds::Mipmaps::Disabled,
    )
    .unwrap();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut file = std::io::BufWriter::new(std::fs::File::create(path).unwrap());
    dds.write(&mut file).unwrap();
}

// =========================================================================
// Game tree fixtures
// =========================================================================

/// Create `<game_root>/Modules/<mod_id>/Assets/<relative>` with `bytes`.
pub fn write_loose(game_root: &Path, mod_id: &str, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = game_root
        .join("Modules")
        .join(mod_id)
        .join("Assets")
        .join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Create `<game_root>/Modules/<mod_id>/AssetPackages/` holding a placeholder
/// package file, and return the directory.
pub fn write_package_dir(game_root: &Path, mod_id: &str) -> PathBuf {
    let dir = game_root.join("Modules").join(mod_id).join("AssetPackages");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("textures.tpac"), b"TPAC").unwrap();
    dir
}

// =========================================================================
// Archive tool double
// =========================================================================

/// In-memory archive tool.
///
/// Each package directory maps to an ordered listing plus the bytes each
/// asset extracts to. Calls are recorded for assertions.
#[derive(Default)]
pub struct MockArchiveTool {
    listings: HashMap<PathBuf, Vec<String>>,
    contents: HashMap<(PathBuf, String), Vec<u8>>,
    failing_list: HashSet<PathBuf>,
    failing_extract: HashSet<PathBuf>,
    pub extract_calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl MockArchiveTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing only; extraction writes placeholder bytes.
    pub fn with_listing(mut self, package_dir: &Path, assets: &[&str]) -> Self {
        self.listings
            .entry(package_dir.to_path_buf())
            .or_default()
            .extend(assets.iter().map(|a| a.to_string()));
        self
    }

    /// Listed asset that extracts to `bytes`.
    pub fn with_asset(mut self, package_dir: &Path, asset: &str, bytes: &[u8]) -> Self {
        self.contents
            .insert((package_dir.to_path_buf(), asset.to_string()), bytes.to_vec());
        self.with_listing(package_dir, &[asset])
    }

    pub fn with_failing_listing(mut self, package_dir: &Path) -> Self {
        self.failing_list.insert(package_dir.to_path_buf());
        self
    }

    pub fn with_failing_extract(mut self, package_dir: &Path) -> Self {
        self.failing_extract.insert(package_dir.to_path_buf());
        self
    }

    pub fn extract_calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.extract_calls.lock().unwrap().clone()
    }
}

fn asset_basename(asset: &str) -> &str {
    asset.rsplit(['/', '\\']).next().unwrap_or(asset)
}

impl ArchiveTool for MockArchiveTool {
    fn list(&self, asset_dir: &Path) -> Result<Vec<String>, ArchiveError> {
        if self.failing_list.contains(asset_dir) {
            return Err(ArchiveError::Failed {
                command: "list".into(),
                status: "exit status: 1".into(),
                stderr: "corrupt package".into(),
            });
        }
        Ok(self.listings.get(asset_dir).cloned().unwrap_or_default())
    }

    fn extract(
        &self,
        asset_dir: &Path,
        assets: &[String],
        output_dir: &Path,
    ) -> Result<(), ArchiveError> {
        self.extract_calls
            .lock()
            .unwrap()
            .push((asset_dir.to_path_buf(), assets.to_vec()));
        if self.failing_extract.contains(asset_dir) {
            return Err(ArchiveError::Failed {
                command: "extract".into(),
                status: "exit status: 2".into(),
                stderr: "extraction failed".into(),
            });
        }
        std::fs::create_dir_all(output_dir)?;
        for asset in assets {
            let bytes = self
                .contents
                .get(&(asset_dir.to_path_buf(), asset.clone()))
                .cloned()
                .unwrap_or_else(|| format!("packed:{asset}").into_bytes());
            std::fs::write(output_dir.join(asset_basename(asset)), bytes)?;
        }
        Ok(())
    }
}
