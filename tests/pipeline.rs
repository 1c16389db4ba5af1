//! End-to-end pipeline over a synthetic game tree.
//!
//! Real PNG sources go through the pure Rust backend; the archive tool is an
//! in-process fake serving one packed texture.

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use texproc::archive::{ArchiveError, ArchiveTool};
use texproc::config::DataLayout;
use texproc::database::AssetDatabase;
use texproc::imaging::{MaxDimension, TargetFormat, TransformSettings};
use texproc::process::{self, ProcessOptions};
use texproc::{install, scan, stage};

struct FakeTpac {
    package_dir: PathBuf,
    assets: Vec<(String, Vec<u8>)>,
}

impl ArchiveTool for FakeTpac {
    fn list(&self, asset_dir: &Path) -> Result<Vec<String>, ArchiveError> {
        if asset_dir != self.package_dir {
            return Ok(Vec::new());
        }
        Ok(self.assets.iter().map(|(name, _)| name.clone()).collect())
    }

    fn extract(
        &self,
        asset_dir: &Path,
        assets: &[String],
        output_dir: &Path,
    ) -> Result<(), ArchiveError> {
        assert_eq!(asset_dir, self.package_dir);
        for wanted in assets {
            let (name, bytes) = self
                .assets
                .iter()
                .find(|(name, _)| name == wanted)
                .expect("requested asset was listed");
            let basename = name.rsplit('/').next().unwrap();
            fs::write(output_dir.join(basename), bytes)?;
        }
        Ok(())
    }
}

struct Game {
    _tmp: TempDir,
    root: PathBuf,
    layout: DataLayout,
    tool: FakeTpac,
    native_wall: PathBuf,
    overhaul_wall: PathBuf,
}

fn opaque_png(path: &Path, width: u32, height: u32, tint: u8) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, tint]))
        .save(path)
        .unwrap();
}

fn translucent_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([200, (x % 256) as u8, (y % 256) as u8, ((x * 2) % 256) as u8])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Two mods: `Native` (loose wall, corrupt texture, one packed shield) and
/// `Overhaul` (its own wall, loaded later so it wins).
fn game() -> Game {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("game");
    let modules = root.join("Modules");

    let native_wall = modules.join("Native/Assets/Textures/wall.png");
    opaque_png(&native_wall, 1024, 256, 10);
    fs::write(modules.join("Native/Assets/Textures/broken.dds"), b"not a dds").unwrap();

    let overhaul_wall = modules.join("Overhaul/Assets/textures/Wall.png");
    opaque_png(&overhaul_wall, 1024, 256, 240);

    let package_dir = modules.join("Native/AssetPackages");
    fs::create_dir_all(&package_dir).unwrap();
    fs::write(package_dir.join("items.tpac"), b"TPAC").unwrap();

    Game {
        layout: DataLayout::new(tmp.path().join("data")),
        tool: FakeTpac {
            package_dir,
            assets: vec![("items/shield.png".to_string(), translucent_png_bytes(64, 64))],
        },
        _tmp: tmp,
        root,
        native_wall,
        overhaul_wall,
    }
}

fn load_order() -> Vec<String> {
    ["Native", "Overhaul", "NotInstalled"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn bc1_512() -> TransformSettings {
    TransformSettings {
        max_dimension: MaxDimension::try_from(512).unwrap(),
        format: TargetFormat::Bc1,
    }
}

fn options() -> ProcessOptions {
    ProcessOptions {
        workers: 2,
        use_cache: true,
    }
}

/// Scan, save the database and stage originals, as the `scan` command does.
fn scan_and_stage(game: &Game) -> AssetDatabase {
    let report = scan::build(&load_order(), &game.root, &game.tool).unwrap();
    report.database.save(&game.layout.database()).unwrap();
    let staged = stage::stage(&report.database, &game.layout.originals(), &game.tool).unwrap();
    assert!(staged.failures.is_empty());
    AssetDatabase::load(&game.layout.database()).unwrap()
}

fn dds_size(path: &Path) -> (u32, u32) {
    let file = fs::File::open(path).unwrap();
    let dds = image_dds::ddsfile::Dds::read(file).unwrap();
    (dds.get_width(), dds.get_height())
}

#[test]
fn scan_resolves_priority_and_stages_winners() {
    let game = game();
    let report = scan::build(&load_order(), &game.root, &game.tool).unwrap();

    assert_eq!(report.mods_scanned, 2);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].item, "NotInstalled");
    assert_eq!(report.database.len(), 3);

    let wall = report.database.get("textures/wall.png").unwrap();
    assert_eq!(wall.destination(), game.overhaul_wall.as_path());
    let shield = report.database.get("items/shield.png").unwrap();
    assert!(shield.destination().starts_with(scan::override_root(&game.root)));

    let db = scan_and_stage(&game);
    assert_eq!(db.len(), 3);
    let originals = game.layout.originals();
    assert_eq!(
        fs::read(originals.join("wall.png")).unwrap(),
        fs::read(&game.overhaul_wall).unwrap()
    );
    assert!(originals.join("shield.png").is_file());
    assert!(originals.join("broken.dds").is_file());
}

#[test]
fn process_resizes_upgrades_and_isolates_failures() {
    let game = game();
    scan_and_stage(&game);
    let processed = game.layout.processed();

    let report =
        process::transform(&game.layout.originals(), &processed, &bc1_512(), &options(), None)
            .unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert!(report.failures[0].item.contains("broken"));
    assert_eq!(dds_size(&processed.join("wall.dds")), (512, 128));
    assert_eq!(dds_size(&processed.join("shield.dds")), (64, 64));

    let upgraded: Vec<_> = report.upgraded().collect();
    assert_eq!(upgraded.len(), 1);
    assert_eq!(upgraded[0].0.output, "shield.dds");
    assert_eq!(upgraded[0].1.format, TargetFormat::Bc3);

    let again =
        process::transform(&game.layout.originals(), &processed, &bc1_512(), &options(), None)
            .unwrap();
    assert_eq!(again.cache_stats.hits, 2);
    assert_eq!(again.failed(), 1);
}

#[test]
fn apply_then_revert_restores_the_tree() {
    let game = game();
    let db = scan_and_stage(&game);
    let processed = game.layout.processed();
    process::transform(&game.layout.originals(), &processed, &bc1_512(), &options(), None)
        .unwrap();

    let native_before = fs::read(&game.native_wall).unwrap();
    let overhaul_before = fs::read(&game.overhaul_wall).unwrap();
    let shield_dest = scan::override_root(&game.root).join("items/shield.png");

    let applied = install::apply(&db, &processed, &game.layout.originals());
    assert_eq!(applied.changed.len(), 2);
    assert!(applied.failures.is_empty());
    assert_eq!(applied.warnings.len(), 1);
    assert_eq!(applied.warnings[0].item, "textures/broken.dds");
    assert_eq!(
        fs::read(&game.overhaul_wall).unwrap(),
        fs::read(processed.join("wall.dds")).unwrap()
    );
    assert!(shield_dest.is_file());
    assert_eq!(fs::read(&game.native_wall).unwrap(), native_before);

    install::write_apply_marker(game.layout.root(), &applied.changed).unwrap();
    assert!(scan::ensure_no_pending_apply(game.layout.root(), false).is_err());
    assert!(scan::ensure_no_pending_apply(game.layout.root(), true).is_ok());

    let reverted = install::revert(&db, &game.layout.originals());
    assert!(reverted.failures.is_empty());
    assert_eq!(fs::read(&game.overhaul_wall).unwrap(), overhaul_before);
    assert!(!shield_dest.exists());
    install::clear_apply_marker(game.layout.root()).unwrap();
    assert!(scan::ensure_no_pending_apply(game.layout.root(), false).is_ok());

    let second = install::revert(&db, &game.layout.originals());
    assert!(second.failures.is_empty());
    assert_eq!(fs::read(&game.overhaul_wall).unwrap(), overhaul_before);
    assert!(!shield_dest.exists());
}

#[test]
fn textures_sharing_a_basename_survive_apply_and_revert() {
    let game = game();
    let assets = game.root.join("Modules/Native/Assets");
    let armor = assets.join("armors/cape.dds");
    let banner = assets.join("banners/cape.dds");
    for (path, bytes) in [(&armor, &b"ARMOR ORIGINAL"[..]), (&banner, &b"BANNER ORIGINAL"[..])] {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }
    let db = scan_and_stage(&game);
    let processed = game.layout.processed();
    fs::create_dir_all(&processed).unwrap();
    fs::write(processed.join("cape.dds"), b"PROCESSED").unwrap();

    let applied = install::apply(&db, &processed, &game.layout.originals());
    let refused: Vec<&str> = applied.failures.iter().map(|e| e.item.as_str()).collect();
    assert_eq!(refused, vec!["armors/cape.dds", "banners/cape.dds"]);
    assert_eq!(fs::read(&armor).unwrap(), b"ARMOR ORIGINAL");

    let reverted = install::revert(&db, &game.layout.originals());
    assert!(reverted.failures.is_empty());
    assert_eq!(fs::read(&armor).unwrap(), b"ARMOR ORIGINAL");
    assert_eq!(fs::read(&banner).unwrap(), b"BANNER ORIGINAL");
}

#[test]
fn apply_before_scan_is_a_precondition_error() {
    let tmp = TempDir::new().unwrap();
    let layout = DataLayout::new(tmp.path());
    let err = AssetDatabase::load(&layout.database()).unwrap_err();
    assert!(err.to_string().contains("run a scan first"));
}
