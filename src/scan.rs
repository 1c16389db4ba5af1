//! Load-order scanning and database building.
//!
//! Stage 1 of the pipeline. Walks every mod in load order and records, for
//! each canonical texture path, which mod's copy wins and where the processed
//! version must be installed.
//!
//! ## Game tree layout
//!
//! ```text
//! <game_root>/Modules/
//! ├── Native/
//! │   ├── Assets/armors/a_armor.dds       # loose asset → armors/a_armor.dds
//! │   └── AssetPackages/core.tpac         # archived assets, listed by the archive tool
//! ├── BetterArmors/
//! │   └── Assets/armors/a_armor.dds       # overrides Native (later in load order)
//! └── zzTextureProcessorOverride/
//!     └── Assets/items/b.dds              # install target for archived assets
//! ```
//!
//! ## Priority
//!
//! Mods are visited strictly in load order, lowest priority first, and every
//! asset found is upserted: the last write wins. Within a single mod the
//! archived listing is recorded before the loose files, so a mod's own loose
//! file beats its own packed copy. When a higher-priority mod packs an asset
//! that a lower-priority mod ships loose, the archived record wins and targets
//! the override location.
//!
//! ## Partial failure
//!
//! A failing archive listing drops that mod's archived contribution and is
//! reported; loose scanning and the remaining mods carry on. A mod directory
//! that does not exist is a warning.

use crate::archive::ArchiveTool;
use crate::database::{ArchiveLocator, AssetDatabase, AssetRecord, canonicalize_asset_path};
use crate::imaging::is_supported_input;
use crate::install;
use crate::types::{ItemFailure, Warning};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Module that receives processed copies of archived assets.
pub const OVERRIDE_MODULE: &str = "zzTextureProcessorOverride";

const MODULES_DIR: &str = "Modules";
const LOOSE_DIR: &str = "Assets";
const PACKAGE_DIR: &str = "AssetPackages";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("load order is empty; aborting scan")]
    EmptyLoadOrder,
    #[error("game directory has no Modules folder: {0}")]
    GameRootMissing(PathBuf),
    #[error("an apply is pending; revert first or rescan with --force")]
    PendingApply,
}

/// Outcome of a database build.
#[derive(Debug)]
pub struct ScanReport {
    pub database: AssetDatabase,
    pub mods_scanned: usize,
    /// Loose files seen across all mods, before priority resolution.
    pub loose_seen: usize,
    /// Archived assets seen across all mods, before priority resolution.
    pub archived_seen: usize,
    pub failures: Vec<ItemFailure>,
    pub warnings: Vec<Warning>,
}

/// Root of the override location for a game installation.
pub fn override_root(game_root: &Path) -> PathBuf {
    game_root
        .join(MODULES_DIR)
        .join(OVERRIDE_MODULE)
        .join(LOOSE_DIR)
}

/// Refuse to rebuild while an apply is pending, unless `force` is set.
///
/// A rescan restages originals, and staged originals are the only backup a
/// pending revert can restore from.
pub fn ensure_no_pending_apply(data_dir: &Path, force: bool) -> Result<(), ScanError> {
    if !force && install::apply_pending(data_dir) {
        return Err(ScanError::PendingApply);
    }
    Ok(())
}

/// Build the asset database from `mod_order` (lowest priority first).
pub fn build(
    mod_order: &[String],
    game_root: &Path,
    tool: &impl ArchiveTool,
) -> Result<ScanReport, ScanError> {
    if mod_order.is_empty() {
        return Err(ScanError::EmptyLoadOrder);
    }
    let modules = game_root.join(MODULES_DIR);
    if !modules.is_dir() {
        return Err(ScanError::GameRootMissing(game_root.to_path_buf()));
    }

    let override_root = override_root(game_root);
    let mut report = ScanReport {
        database: AssetDatabase::new(override_root.clone()),
        mods_scanned: 0,
        loose_seen: 0,
        archived_seen: 0,
        failures: Vec::new(),
        warnings: Vec::new(),
    };

    for mod_id in mod_order {
        if mod_id == OVERRIDE_MODULE {
            continue;
        }
        let mod_dir = modules.join(mod_id);
        if !mod_dir.is_dir() {
            tracing::warn!(mod_id = %mod_id, "mod directory missing, skipping");
            report
                .warnings
                .push(Warning::new(mod_id, "mod directory not found"));
            continue;
        }
        report.mods_scanned += 1;

        let package_dir = mod_dir.join(PACKAGE_DIR);
        if package_dir.is_dir() {
            match tool.list(&package_dir) {
                Ok(assets) => {
                    for asset in assets {
                        if !is_supported_input(Path::new(&asset)) {
                            continue;
                        }
                        let canonical = canonicalize_asset_path(&asset);
                        let record = AssetRecord::archived(
                            ArchiveLocator {
                                package_dir: package_dir.clone(),
                                asset,
                            },
                            &override_root,
                        );
                        report.database.upsert(canonical, record);
                        report.archived_seen += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(mod_id = %mod_id, "archive listing failed: {e}");
                    report.failures.push(ItemFailure::new(mod_id, e));
                }
            }
        }

        let loose_dir = mod_dir.join(LOOSE_DIR);
        if loose_dir.is_dir() {
            for path in loose_textures(&loose_dir) {
                let Ok(relative) = path.strip_prefix(&loose_dir) else {
                    continue;
                };
                let canonical = canonicalize_asset_path(&relative.to_string_lossy());
                report
                    .database
                    .upsert(canonical, AssetRecord::loose(path.clone()));
                report.loose_seen += 1;
            }
        }

        tracing::debug!(mod_id = %mod_id, records = report.database.len(), "mod scanned");
    }

    tracing::info!(
        records = report.database.len(),
        mods = report.mods_scanned,
        "database build complete"
    );
    Ok(report)
}

/// Texture files under `dir`, in a stable order.
fn loose_textures(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_supported_input(e.path()))
        .map(|e| e.into_path())
        .collect()
}
