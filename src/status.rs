//! Snapshot of the data directory for the `status` command.

use crate::config::{DataLayout, Settings};
use crate::database::{AssetDatabase, DatabaseError, OriginKind};
use crate::imaging::{MaxDimension, TargetFormat, is_supported_input};
use crate::install;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseState {
    Missing,
    Loaded { loose: usize, archived: usize },
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub game_root: Option<PathBuf>,
    pub max_dimension: Option<MaxDimension>,
    pub format: Option<TargetFormat>,
    pub database: DatabaseState,
    pub originals: usize,
    pub processed: usize,
    pub apply_pending: bool,
}

/// Collect a [`Status`]. Never fails: unreadable parts are reported as such.
pub fn gather(layout: &DataLayout, settings: &Settings) -> Status {
    let database = match AssetDatabase::load(&layout.database()) {
        Ok(db) => DatabaseState::Loaded {
            loose: db.count_kind(OriginKind::Loose),
            archived: db.count_kind(OriginKind::Archived),
        },
        Err(DatabaseError::NotFound(_)) => DatabaseState::Missing,
        Err(e) => DatabaseState::Unreadable(e.to_string()),
    };

    Status {
        game_root: settings.paths.game_root.clone(),
        max_dimension: settings.resize.max_dimension,
        format: settings.resize.format,
        database,
        originals: count_files(&layout.originals(), is_supported_input),
        processed: count_files(&layout.processed(), |p| {
            p.extension().is_some_and(|e| e.eq_ignore_ascii_case("dds"))
        }),
        apply_pending: install::apply_pending(layout.root()),
    }
}

fn count_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && keep(p))
        .count()
}
