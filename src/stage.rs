//! Staging of original textures.
//!
//! Stage 2 of the pipeline. Every record in the database gets one local copy
//! under the originals directory, named by the canonical path's basename:
//!
//! ```text
//! data/originals/
//! ├── a_armor.dds     # copied from a mod's loose Assets/ tree
//! └── b.dds           # extracted from an AssetPackages/ archive
//! ```
//!
//! The staged files are both the input to the transform and the backup that
//! revert restores loose destinations from. Staging never deletes anything.
//!
//! Archived records are extracted in one archive-tool call per package
//! directory. A failed call fails every asset in that package and is reported
//! once; other packages and loose copies carry on.

use crate::archive::ArchiveTool;
use crate::database::{AssetDatabase, AssetRecord, processed_file_name, staged_file_name};
use crate::types::{ItemFailure, Warning};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("cannot create originals directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
pub struct StageReport {
    pub copied: usize,
    pub extracted: usize,
    pub failures: Vec<ItemFailure>,
    pub warnings: Vec<Warning>,
}

impl StageReport {
    pub fn staged(&self) -> usize {
        self.copied + self.extracted
    }
}

/// One archived asset awaiting extraction.
struct PendingExtract<'a> {
    canonical: &'a str,
    asset: &'a str,
}

/// Stage every record of `db` into `originals_dir`.
pub fn stage(
    db: &AssetDatabase,
    originals_dir: &Path,
    tool: &impl ArchiveTool,
) -> Result<StageReport, StageError> {
    std::fs::create_dir_all(originals_dir).map_err(|source| StageError::CreateDir {
        path: originals_dir.to_path_buf(),
        source,
    })?;

    let mut report = StageReport {
        warnings: name_collisions(db),
        ..Default::default()
    };
    let mut by_package: BTreeMap<&Path, Vec<PendingExtract<'_>>> = BTreeMap::new();

    for (canonical, record) in db.iter() {
        match record {
            AssetRecord::Loose { origin_locator, .. } => {
                let target = originals_dir.join(staged_file_name(canonical));
                match std::fs::copy(origin_locator, &target) {
                    Ok(_) => report.copied += 1,
                    Err(e) => {
                        tracing::warn!(%canonical, "copy failed: {e}");
                        report.failures.push(ItemFailure::new(
                            canonical.as_str(),
                            format!("copy from {}: {e}", origin_locator.display()),
                        ));
                    }
                }
            }
            AssetRecord::Archived { origin_locator, .. } => {
                by_package
                    .entry(origin_locator.package_dir.as_path())
                    .or_default()
                    .push(PendingExtract {
                        canonical,
                        asset: &origin_locator.asset,
                    });
            }
        }
    }

    for (package_dir, pending) in by_package {
        let assets: Vec<String> = pending.iter().map(|p| p.asset.to_string()).collect();
        tracing::debug!(package = %package_dir.display(), count = assets.len(), "extracting");
        if let Err(e) = tool.extract(package_dir, &assets, originals_dir) {
            tracing::warn!(package = %package_dir.display(), "extract failed: {e}");
            report
                .failures
                .push(ItemFailure::new(package_dir.display().to_string(), e));
            continue;
        }
        for p in &pending {
            match settle_extracted(originals_dir, p) {
                Ok(()) => report.extracted += 1,
                Err(detail) => report.failures.push(ItemFailure::new(p.canonical, detail)),
            }
        }
    }

    tracing::info!(
        staged = report.staged(),
        failed = report.failures.len(),
        "staging complete"
    );
    Ok(report)
}

/// Move the tool's output (named by the asset's own basename) to the staged
/// name derived from the canonical path.
fn settle_extracted(originals_dir: &Path, pending: &PendingExtract<'_>) -> Result<(), String> {
    let raw_name = pending
        .asset
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(pending.asset);
    let extracted = originals_dir.join(raw_name);
    let staged = originals_dir.join(staged_file_name(pending.canonical));

    if !extracted.is_file() {
        return Err(format!(
            "archive tool did not produce {}",
            extracted.display()
        ));
    }
    if extracted != staged {
        std::fs::rename(&extracted, &staged)
            .map_err(|e| format!("rename to {}: {e}", staged.display()))?;
    }
    Ok(())
}

/// Records that share a staged or processed file name with an earlier record
/// in canonical order. Apply refuses every member of such a group.
fn name_collisions(db: &AssetDatabase) -> Vec<Warning> {
    let staged = db.shared_names(|c| staged_file_name(c).to_string());
    let processed = db.shared_names(processed_file_name);
    let mut warned = HashSet::new();
    let mut warnings = Vec::new();

    for (kind, groups) in [("staged", staged), ("processed", processed)] {
        for (name, claimants) in groups {
            let first = claimants[0];
            for &canonical in &claimants[1..] {
                if !warned.insert(canonical) {
                    continue;
                }
                tracing::warn!(%canonical, previous = %first, "{kind} file name collision");
                warnings.push(Warning::new(
                    canonical,
                    format!("shares {kind} name `{name}` with {first}; neither will be installed"),
                ));
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ArchiveLocator;
    use crate::test_helpers::{MockArchiveTool, write_loose, write_package_dir};
    use tempfile::TempDir;

    fn archived(db: &mut AssetDatabase, pkg: &Path, asset: &str) {
        let canonical = crate::database::canonicalize_asset_path(asset);
        let record = AssetRecord::archived(
            ArchiveLocator {
                package_dir: pkg.to_path_buf(),
                asset: asset.to_string(),
            },
            &db.override_root.clone(),
        );
        db.upsert(canonical, record);
    }

    #[test]
    fn loose_records_are_copied_by_basename() {
        let tmp = TempDir::new().unwrap();
        let src = write_loose(tmp.path(), "A", "armors/a_armor.dds", b"original");
        let mut db = AssetDatabase::new(tmp.path().join("override"));
        db.upsert("armors/a_armor.dds".into(), AssetRecord::loose(src));

        let originals = tmp.path().join("data/originals");
        let report = stage(&db, &originals, &MockArchiveTool::new()).unwrap();

        assert_eq!(report.copied, 1);
        assert!(report.failures.is_empty());
        assert_eq!(std::fs::read(originals.join("a_armor.dds")).unwrap(), b"original");
    }

    #[test]
    fn archived_records_are_batched_per_package() {
        let tmp = TempDir::new().unwrap();
        let pkg_a = write_package_dir(tmp.path(), "A");
        let pkg_b = write_package_dir(tmp.path(), "B");
        let tool = MockArchiveTool::new()
            .with_asset(&pkg_a, "items/one.dds", b"one")
            .with_asset(&pkg_a, "items/two.dds", b"two")
            .with_asset(&pkg_b, "ui/three.dds", b"three");
        let mut db = AssetDatabase::new(tmp.path().join("override"));
        archived(&mut db, &pkg_a, "items/one.dds");
        archived(&mut db, &pkg_a, "items/two.dds");
        archived(&mut db, &pkg_b, "ui/three.dds");

        let originals = tmp.path().join("originals");
        let report = stage(&db, &originals, &tool).unwrap();

        assert_eq!(report.extracted, 3);
        let calls = tool.extract_calls();
        assert_eq!(calls.len(), 2);
        let a_call = calls.iter().find(|(p, _)| *p == pkg_a).unwrap();
        assert_eq!(a_call.1, vec!["items/one.dds", "items/two.dds"]);
        assert_eq!(std::fs::read(originals.join("three.dds")).unwrap(), b"three");
    }

    #[test]
    fn extracted_name_is_normalized_to_canonical_basename() {
        let tmp = TempDir::new().unwrap();
        let pkg = write_package_dir(tmp.path(), "A");
        let tool = MockArchiveTool::new().with_asset(&pkg, "Items\\Shield.DDS", b"s");
        let mut db = AssetDatabase::new(tmp.path().join("override"));
        archived(&mut db, &pkg, "Items\\Shield.DDS");

        let originals = tmp.path().join("originals");
        let report = stage(&db, &originals, &tool).unwrap();

        assert_eq!(report.extracted, 1);
        assert_eq!(std::fs::read(originals.join("shield.dds")).unwrap(), b"s");
    }

    #[test]
    fn failed_extract_is_one_failure_and_others_continue() {
        let tmp = TempDir::new().unwrap();
        let bad = write_package_dir(tmp.path(), "Bad");
        let good = write_package_dir(tmp.path(), "Good");
        let loose = write_loose(tmp.path(), "Good", "c.dds", b"c");
        let tool = MockArchiveTool::new()
            .with_listing(&bad, &["x.dds", "y.dds"])
            .with_asset(&good, "z.dds", b"z")
            .with_failing_extract(&bad);
        let mut db = AssetDatabase::new(tmp.path().join("override"));
        archived(&mut db, &bad, "x.dds");
        archived(&mut db, &bad, "y.dds");
        archived(&mut db, &good, "z.dds");
        db.upsert("c.dds".into(), AssetRecord::loose(loose));

        let originals = tmp.path().join("originals");
        let report = stage(&db, &originals, &tool).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, bad.display().to_string());
        assert_eq!(report.extracted, 1);
        assert_eq!(report.copied, 1);
        assert!(originals.join("z.dds").exists());
    }

    #[test]
    fn missing_loose_source_is_per_item_failure() {
        let tmp = TempDir::new().unwrap();
        let mut db = AssetDatabase::new(tmp.path().join("override"));
        db.upsert(
            "gone.dds".into(),
            AssetRecord::loose(tmp.path().join("Modules/A/Assets/gone.dds")),
        );

        let report = stage(&db, &tmp.path().join("originals"), &MockArchiveTool::new()).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, "gone.dds");
    }

    #[test]
    fn shared_basenames_are_warned() {
        let tmp = TempDir::new().unwrap();
        let a = write_loose(tmp.path(), "A", "armors/cape.dds", b"armor");
        let b = write_loose(tmp.path(), "A", "banners/cape.dds", b"banner");
        let mut db = AssetDatabase::new(tmp.path().join("override"));
        db.upsert("armors/cape.dds".into(), AssetRecord::loose(a));
        db.upsert("banners/cape.dds".into(), AssetRecord::loose(b));

        let originals = tmp.path().join("originals");
        let report = stage(&db, &originals, &MockArchiveTool::new()).unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].item, "banners/cape.dds");
        assert_eq!(std::fs::read(originals.join("cape.dds")).unwrap(), b"banner");
    }

    #[test]
    fn shared_processed_names_are_warned() {
        let tmp = TempDir::new().unwrap();
        let png = write_loose(tmp.path(), "A", "armors/a.png", b"png");
        let tga = write_loose(tmp.path(), "A", "ui/a.tga", b"tga");
        let mut db = AssetDatabase::new(tmp.path().join("override"));
        db.upsert("armors/a.png".into(), AssetRecord::loose(png));
        db.upsert("ui/a.tga".into(), AssetRecord::loose(tga));

        let originals = tmp.path().join("originals");
        let report = stage(&db, &originals, &MockArchiveTool::new()).unwrap();

        assert_eq!(report.copied, 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].item, "ui/a.tga");
        assert!(report.warnings[0].message.contains("processed name `a.dds`"));
    }
}
