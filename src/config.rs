//! Persisted settings.
//!
//! Handles loading, validating, and updating `settings.toml` in the data
//! directory. Settings are loaded once per invocation into an immutable
//! [`Settings`] value that is passed explicitly to each stage.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional
//!
//! [resize]
//! max_dimension = 2048      # 4096, 2048, 1024 or 512
//! format = "BC7"            # BC1, BC2, BC3 or BC7
//!
//! [paths]
//! game_root = "C:/Games/Mount & Blade II Bannerlord"
//! load_order = "C:/Users/me/Documents/Mount and Blade II Bannerlord/Configs/LauncherData.xml"
//! archive_tool = "TpacToolCli"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Both `resize` keys must be set before a transform can run. The CLI's
//! `set-*` commands merge a single key into the existing file, so other keys
//! survive. Unknown keys are rejected to catch typos early.

use crate::imaging::{MaxDimension, TargetFormat, TransformSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the settings file within the data directory.
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// Fixed layout of the data directory.
///
/// ```text
/// data/
/// ├── settings.toml
/// ├── asset_database.json
/// ├── applied.json        # only between apply and revert
/// ├── originals/          # staged originals, also the revert backups
/// └── processed/          # transform output + transform cache
/// ```
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database(&self) -> PathBuf {
        self.root.join(crate::database::DATABASE_FILENAME)
    }

    pub fn originals(&self) -> PathBuf {
        self.root.join("originals")
    }

    pub fn processed(&self) -> PathBuf {
        self.root.join("processed")
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("`{0}` is not set (run `texproc set-{1}` first)")]
    MissingSetting(&'static str, &'static str),
}

/// Settings loaded from `settings.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Transform parameters.
    pub resize: ResizeConfig,
    /// Game and tool locations.
    pub paths: PathsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub max_dimension: Option<MaxDimension>,
    pub format: Option<TargetFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Game installation directory (contains `Modules/`).
    pub game_root: Option<PathBuf>,
    /// Launcher mod configuration. Falls back to the launcher's default location.
    pub load_order: Option<PathBuf>,
    /// Archive CLI name or path. Falls back to [`crate::archive::DEFAULT_TOOL`].
    pub archive_tool: Option<String>,
}

impl Settings {
    /// Validate values that the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if let Some(tool) = &self.paths.archive_tool
            && tool.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "paths.archive_tool must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Both resize settings, or the first one missing.
    pub fn transform_settings(&self) -> Result<TransformSettings, ConfigError> {
        let max_dimension = self
            .resize
            .max_dimension
            .ok_or(ConfigError::MissingSetting("resize.max_dimension", "resize"))?;
        let format = self
            .resize
            .format
            .ok_or(ConfigError::MissingSetting("resize.format", "format"))?;
        Ok(TransformSettings {
            max_dimension,
            format,
        })
    }

    pub fn game_root(&self) -> Result<&Path, ConfigError> {
        self.paths
            .game_root
            .as_deref()
            .ok_or(ConfigError::MissingSetting("paths.game_root", "game-root"))
    }

    pub fn archive_tool(&self) -> &str {
        self.paths
            .archive_tool
            .as_deref()
            .unwrap_or(crate::archive::DEFAULT_TOOL)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel transform workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective worker count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `settings.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_settings(data_dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let path = data_dir.join(SETTINGS_FILENAME);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(Some(toml::from_str(&content)?))
}

fn resolve_settings(raw: Option<toml::Value>) -> Result<Settings, ConfigError> {
    let settings: Settings = match raw {
        Some(value) => value.try_into()?,
        None => Settings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

/// Load settings from the data directory. A missing file means all defaults.
pub fn load_settings(data_dir: &Path) -> Result<Settings, ConfigError> {
    resolve_settings(load_raw_settings(data_dir)?)
}

/// Merge `table.key = value` into the settings file and return the result.
///
/// The merged file is validated before it is written, so an invalid value
/// leaves the file untouched.
pub fn set_value(
    data_dir: &Path,
    table: &str,
    key: &str,
    value: toml::Value,
) -> Result<Settings, ConfigError> {
    let mut inner = toml::Table::new();
    inner.insert(key.to_string(), value);
    let mut overlay = toml::Table::new();
    overlay.insert(table.to_string(), toml::Value::Table(inner));

    let base = load_raw_settings(data_dir)?.unwrap_or(toml::Value::Table(toml::Table::new()));
    let merged = merge_toml(base, toml::Value::Table(overlay));
    let settings = resolve_settings(Some(merged.clone()))?;

    fs::create_dir_all(data_dir)?;
    fs::write(
        data_dir.join(SETTINGS_FILENAME),
        toml::to_string_pretty(&merged)?,
    )?;
    tracing::debug!(%table, %key, "setting saved");
    Ok(settings)
}

/// Returns a fully-commented stock `settings.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_settings_toml() -> &'static str {
    r##"# texproc settings
# ================
#
# Lives in the data directory as settings.toml. Every key is optional;
# unknown keys are rejected. The `set-*` commands edit this file for you.

# ---------------------------------------------------------------------------
# Transform parameters. Both must be set before `texproc process` runs.
# ---------------------------------------------------------------------------
[resize]
# Largest width or height of an output texture. One of 4096, 2048, 1024, 512.
# Textures already within the limit keep their size.
# max_dimension = 2048

# Block-compressed DDS format: "BC1", "BC2", "BC3" or "BC7".
# BC1 has no usable alpha; textures with transparency are written as BC3.
# format = "BC7"

# ---------------------------------------------------------------------------
# Locations
# ---------------------------------------------------------------------------
[paths]
# Game installation directory, the one containing Modules/.
# game_root = "C:/Program Files (x86)/Steam/steamapps/common/Mount & Blade II Bannerlord"

# Launcher mod configuration. Defaults to
# ~/Documents/Mount and Blade II Bannerlord/Configs/LauncherData.xml
# load_order = "LauncherData.xml"

# Archive CLI used to list and extract .tpac packages.
# Bare names are looked up on PATH.
# archive_tool = "TpacToolCli"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel transform workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
