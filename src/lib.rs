//! # texproc
//!
//! Batch downscaler for Mount & Blade II: Bannerlord mod textures. It shrinks
//! every texture the active mods ship, recompresses it to a block-compressed
//! DDS format, installs the result into the game tree, and can undo that
//! install exactly.
//!
//! # Architecture: Four-Stage Pipeline
//!
//! ```text
//! 1. Scan      load order + Modules/  →  asset_database.json   (who wins each path)
//!    Stage     asset database         →  data/originals/       (copies + extractions)
//! 2. Process   data/originals/        →  data/processed/       (resize + BCn encode)
//! 3. Apply     data/processed/        →  mod tree + override module
//! 4. Revert    data/originals/        →  mod tree, override files deleted
//! ```
//!
//! Each stage reads only what the previous one persisted, so stages run as
//! separate invocations and a failed run can be resumed from the last good
//! stage.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`load_order`] | Reads the launcher's mod list, lowest priority first |
//! | [`archive`] | [`archive::ArchiveTool`] trait and the subprocess implementation for `.tpac` packages |
//! | [`scan`] | Builds the [`database::AssetDatabase`] from the mod tree: last mod in load order wins |
//! | [`database`] | Asset records and their JSON persistence |
//! | [`stage`] | Copies loose originals and extracts archived ones into the originals directory |
//! | [`imaging`] | Pure-Rust decode, Lanczos3 resize and BCn encode |
//! | [`process`] | Parallel transform of all staged originals, with progress events |
//! | [`cache`] | Content-addressed transform cache |
//! | [`install`] | Apply and revert, plus the apply marker |
//! | [`config`] | `settings.toml` loading, validation and updates; data directory layout |
//! | [`status`] | Snapshot of settings and data directory for `texproc status` |
//! | [`types`] | Per-item failure and warning types shared by every batch |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Database-Driven Install
//!
//! Apply and revert never look at the mod tree to decide what to do. The
//! asset database says, for each canonical path, where the winning copy came
//! from and where the processed copy goes. Loose assets go back where they
//! were found. Archived assets cannot be written back into a package, so they
//! are installed into `Modules/zzTextureProcessorOverride/Assets/`, which
//! sorts after every real mod.
//!
//! ## Per-Item Failures
//!
//! One bad texture never stops a batch. Every stage collects
//! [`types::ItemFailure`]s and reports them together at the end; only
//! precondition problems (no database, settings missing, archive tool not
//! found) abort an operation.

pub mod archive;
pub mod cache;
pub mod config;
pub mod database;
pub mod imaging;
pub mod install;
pub mod load_order;
pub mod output;
pub mod process;
pub mod scan;
pub mod stage;
pub mod status;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
