//! Installing processed textures into the game tree, and undoing it.
//!
//! Stage 4 of the pipeline. Both directions are driven entirely by the asset
//! database:
//!
//! | Origin | [`apply`] | [`revert`] |
//! |---|---|---|
//! | loose | overwrite the mod's own file with the processed DDS | copy the staged original back |
//! | tpac | create the file under the override module | delete that file |
//!
//! No snapshot is taken at apply time. Revert restores loose files from the
//! originals staged during the scan, so [`apply`] refuses to overwrite a loose
//! destination that has no staged original.
//!
//! Staged originals and processed outputs are stored flat by basename. Records
//! that share either name cannot be told apart on disk, so [`apply`] refuses
//! all of them and [`revert`] leaves their destinations alone.
//!
//! ## Apply marker
//!
//! A successful apply writes `applied.json` to the data directory, listing
//! the canonical paths it changed. Revert removes it once everything was
//! restored. While it exists, a rescan is refused so the staged backups a
//! pending revert depends on are not replaced.

use crate::database::{AssetDatabase, AssetRecord, processed_file_name, staged_file_name};
use crate::types::{ItemFailure, Warning};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Name of the apply marker within the data directory.
pub const APPLY_MARKER_FILENAME: &str = "applied.json";

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("apply marker error: {0}")]
    Marker(#[from] serde_json::Error),
}

/// End-of-batch tally for apply or revert.
#[derive(Debug, Default)]
pub struct InstallReport {
    /// Destinations written (apply), or restored/deleted (revert).
    pub changed: Vec<String>,
    pub warnings: Vec<Warning>,
    pub failures: Vec<ItemFailure>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApplyMarker {
    applied: Vec<String>,
}

/// Copy every processed output onto its record's destination.
pub fn apply(db: &AssetDatabase, processed_dir: &Path, originals_dir: &Path) -> InstallReport {
    let mut report = InstallReport::default();
    let contested = contested_records(db);

    for (canonical, record) in db.iter() {
        if let Some(reason) = contested.get(canonical.as_str()) {
            tracing::warn!(%canonical, "{reason}");
            report
                .failures
                .push(ItemFailure::new(canonical.as_str(), reason));
            continue;
        }

        let processed = processed_dir.join(processed_file_name(canonical));
        if !processed.is_file() {
            tracing::warn!(%canonical, "no processed output, skipping");
            report
                .warnings
                .push(Warning::new(canonical.as_str(), "no processed output"));
            continue;
        }

        if let AssetRecord::Loose { .. } = record
            && !originals_dir.join(staged_file_name(canonical)).is_file()
        {
            report.failures.push(ItemFailure::new(
                canonical.as_str(),
                "no staged original to revert to; refusing to overwrite",
            ));
            continue;
        }

        let destination = record.destination();
        match copy_creating_dirs(&processed, destination) {
            Ok(()) => {
                tracing::debug!(%canonical, to = %destination.display(), "applied");
                report.changed.push(canonical.clone());
            }
            Err(e) => report.failures.push(ItemFailure::new(
                canonical.as_str(),
                format!("copy to {}: {e}", destination.display()),
            )),
        }
    }

    tracing::info!(
        applied = report.changed.len(),
        failed = report.failures.len(),
        "apply complete"
    );
    report
}

/// Undo an apply: delete override files, restore loose originals.
///
/// Idempotent. A second run finds nothing to delete and copies the same
/// backups again.
pub fn revert(db: &AssetDatabase, originals_dir: &Path) -> InstallReport {
    let mut report = InstallReport::default();
    let shared_backups = db.shared_names(|c| staged_file_name(c).to_string());
    let shared_backup = |canonical: &str| {
        shared_backups
            .get(staged_file_name(canonical))
            .is_some_and(|claimants| claimants.iter().any(|c| *c == canonical))
    };

    for (canonical, record) in db.iter() {
        let destination = record.destination();
        match record {
            AssetRecord::Archived { .. } => {
                if !destination.exists() {
                    continue;
                }
                match std::fs::remove_file(destination) {
                    Ok(()) => report.changed.push(canonical.clone()),
                    Err(e) => report.failures.push(ItemFailure::new(
                        canonical.as_str(),
                        format!("delete {}: {e}", destination.display()),
                    )),
                }
            }
            AssetRecord::Loose { .. } if shared_backup(canonical.as_str()) => {
                report.warnings.push(Warning::new(
                    canonical.as_str(),
                    "staged original is shared with another asset; left untouched",
                ));
            }
            AssetRecord::Loose { .. } => {
                let original = originals_dir.join(staged_file_name(canonical));
                if !original.is_file() {
                    tracing::warn!(%canonical, "no staged original, skipping");
                    report
                        .warnings
                        .push(Warning::new(canonical.as_str(), "no staged original"));
                    continue;
                }
                match copy_creating_dirs(&original, destination) {
                    Ok(()) => report.changed.push(canonical.clone()),
                    Err(e) => report.failures.push(ItemFailure::new(
                        canonical.as_str(),
                        format!("restore to {}: {e}", destination.display()),
                    )),
                }
            }
        }
    }

    tracing::info!(
        reverted = report.changed.len(),
        failed = report.failures.len(),
        "revert complete"
    );
    report
}

/// Records whose staged original or processed output is shared with another
/// record, with the reason each one cannot be installed.
fn contested_records(db: &AssetDatabase) -> HashMap<&str, String> {
    let mut contested = HashMap::new();
    let staged = db.shared_names(|c| staged_file_name(c).to_string());
    let processed = db.shared_names(processed_file_name);
    for (kind, groups) in [("staged original", staged), ("processed output", processed)] {
        for (name, claimants) in groups {
            for &canonical in &claimants {
                let others: Vec<&str> = claimants
                    .iter()
                    .copied()
                    .filter(|other| *other != canonical)
                    .collect();
                contested.entry(canonical).or_insert_with(|| {
                    format!(
                        "{kind} `{name}` is shared with {}; refusing to install",
                        others.join(", ")
                    )
                });
            }
        }
    }
    contested
}

fn copy_creating_dirs(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(from, to)?;
    Ok(())
}

/// Whether an apply has not been reverted yet.
pub fn apply_pending(data_dir: &Path) -> bool {
    data_dir.join(APPLY_MARKER_FILENAME).is_file()
}

/// Record the canonical paths an apply changed.
pub fn write_apply_marker(data_dir: &Path, applied: &[String]) -> Result<(), InstallError> {
    std::fs::create_dir_all(data_dir)?;
    let marker = ApplyMarker {
        applied: applied.to_vec(),
    };
    let json = serde_json::to_string_pretty(&marker)?;
    std::fs::write(data_dir.join(APPLY_MARKER_FILENAME), json)?;
    Ok(())
}

/// Remove the apply marker, if present.
pub fn clear_apply_marker(data_dir: &Path) -> Result<(), InstallError> {
    match std::fs::remove_file(data_dir.join(APPLY_MARKER_FILENAME)) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
