//! Asset provenance database.
//!
//! The database maps every canonical asset path (`armors/a_armor.dds`) to the
//! place the asset came from and the place its processed version must be
//! installed. It is the single source of truth shared by scan, process, apply
//! and revert, so it lives on disk between invocations.
//!
//! ## File format
//!
//! Pretty-printed JSON with sorted keys, so operators can read and diff it
//! between an apply and a revert:
//!
//! ```json
//! {
//!   "version": 1,
//!   "override_root": "/game/Modules/zzTextureProcessorOverride/Assets",
//!   "assets": {
//!     "armors/a_armor.dds": {
//!       "origin_kind": "loose",
//!       "origin_locator": "/game/Modules/A/Assets/armors/a_armor.dds",
//!       "destination_locator": "/game/Modules/A/Assets/armors/a_armor.dds"
//!     },
//!     "items/b.dds": {
//!       "origin_kind": "tpac",
//!       "origin_locator": { "package_dir": "/game/Modules/N/AssetPackages", "asset": "items/b.dds" },
//!       "destination_locator": "/game/Modules/zzTextureProcessorOverride/Assets/items/b.dds"
//!     }
//!   }
//! }
//! ```
//!
//! ## Staged and processed names
//!
//! Staged originals are stored flat under the originals directory by the
//! canonical path's basename ([`staged_file_name`]); processed outputs use the
//! same stem with a `.dds` extension ([`processed_file_name`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the database file within the data directory.
pub const DATABASE_FILENAME: &str = "asset_database.json";

/// Bump when the on-disk layout changes.
const DATABASE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("asset database not found at {0}; run a scan first")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("asset database is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("asset database version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Location of an asset packed inside an archive directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchiveLocator {
    /// Directory handed to the archive tool (`<mod>/AssetPackages`).
    pub package_dir: PathBuf,
    /// Logical asset path as the archive tool reports it.
    pub asset: String,
}

/// Which kind of origin a record has, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginKind {
    Loose,
    Archived,
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginKind::Loose => f.write_str("loose"),
            OriginKind::Archived => f.write_str("tpac"),
        }
    }
}

/// Provenance of one canonical asset.
///
/// Loose assets are overwritten in place, so their destination equals their
/// origin. Archived assets never had a loose file, so they are installed into
/// the override location and reverting them means deleting that file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin_kind", rename_all = "snake_case")]
pub enum AssetRecord {
    Loose {
        origin_locator: PathBuf,
        destination_locator: PathBuf,
    },
    #[serde(rename = "tpac")]
    Archived {
        origin_locator: ArchiveLocator,
        destination_locator: PathBuf,
    },
}

impl AssetRecord {
    /// A loose file that is overwritten in place.
    pub fn loose(path: PathBuf) -> Self {
        AssetRecord::Loose {
            origin_locator: path.clone(),
            destination_locator: path,
        }
    }

    /// A packed asset installed under `override_root` at the asset's own
    /// relative path. Letter case is kept as the package lists it.
    pub fn archived(locator: ArchiveLocator, override_root: &Path) -> Self {
        let relative = normalize_asset_path(&locator.asset);
        AssetRecord::Archived {
            destination_locator: override_root.join(relative),
            origin_locator: locator,
        }
    }

    pub fn kind(&self) -> OriginKind {
        match self {
            AssetRecord::Loose { .. } => OriginKind::Loose,
            AssetRecord::Archived { .. } => OriginKind::Archived,
        }
    }

    pub fn destination(&self) -> &Path {
        match self {
            AssetRecord::Loose {
                destination_locator,
                ..
            }
            | AssetRecord::Archived {
                destination_locator,
                ..
            } => destination_locator,
        }
    }
}

/// Mapping from canonical path to [`AssetRecord`].
///
/// Exactly one record per canonical path. [`AssetDatabase::upsert`] replaces
/// any earlier record, which is how load-order priority is resolved: callers
/// insert in ascending priority and the last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDatabase {
    pub version: u32,
    /// Root of the override location used by archived records.
    pub override_root: PathBuf,
    pub assets: BTreeMap<String, AssetRecord>,
}

impl AssetDatabase {
    pub fn new(override_root: PathBuf) -> Self {
        Self {
            version: DATABASE_VERSION,
            override_root,
            assets: BTreeMap::new(),
        }
    }

    /// Insert or replace the record for `canonical`, returning the replaced one.
    pub fn upsert(&mut self, canonical: String, record: AssetRecord) -> Option<AssetRecord> {
        self.assets.insert(canonical, record)
    }

    pub fn get(&self, canonical: &str) -> Option<&AssetRecord> {
        self.assets.get(canonical)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Records in canonical-path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AssetRecord)> {
        self.assets.iter()
    }

    pub fn count_kind(&self, kind: OriginKind) -> usize {
        self.assets.values().filter(|r| r.kind() == kind).count()
    }

    /// File names claimed by more than one canonical path, with the
    /// claimants in canonical order.
    ///
    /// `name_of` derives the staged or processed name. Records in one group
    /// overwrite each other's staged original or processed output, so none
    /// of them can be installed or restored safely.
    pub fn shared_names(&self, name_of: impl Fn(&str) -> String) -> BTreeMap<String, Vec<&str>> {
        let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for canonical in self.assets.keys() {
            groups.entry(name_of(canonical)).or_default().push(canonical);
        }
        groups.retain(|_, claimants| claimants.len() > 1);
        groups
    }

    /// Load a database file.
    ///
    /// A missing file is [`DatabaseError::NotFound`] so callers can tell the
    /// operator to scan first; anything unreadable is fatal.
    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DatabaseError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let db: Self = serde_json::from_str(&content)?;
        if db.version != DATABASE_VERSION {
            return Err(DatabaseError::UnsupportedVersion {
                found: db.version,
                expected: DATABASE_VERSION,
            });
        }
        Ok(db)
    }

    /// Write the database, replacing any previous file in one rename.
    pub fn save(&self, path: &Path) -> Result<(), DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Relative asset path with `/` separators and no leading separator.
pub fn normalize_asset_path(raw: &str) -> String {
    raw.trim()
        .replace('\\', "/")
        .trim_start_matches('/')
        .to_string()
}

/// Normalize a relative asset path into its canonical form.
///
/// Like [`normalize_asset_path`], but lower-cased, so `Armors\A_Armor.DDS`
/// and `armors/a_armor.dds` collide.
pub fn canonicalize_asset_path(raw: &str) -> String {
    normalize_asset_path(raw).to_lowercase()
}

/// Final path component of a canonical path.
pub fn basename(canonical: &str) -> &str {
    canonical.rsplit('/').next().unwrap_or(canonical)
}

/// File name a record's original is staged under.
pub fn staged_file_name(canonical: &str) -> &str {
    basename(canonical)
}

/// File name a record's processed output is written under.
pub fn processed_file_name(canonical: &str) -> String {
    let name = basename(canonical);
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    format!("{stem}.dds")
}
