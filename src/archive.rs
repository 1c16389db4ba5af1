//! Archive tool integration.
//!
//! Packed assets are listed and extracted by an external command-line tool;
//! this crate never parses archive files itself. The [`ArchiveTool`] trait is
//! the seam, [`CliArchiveTool`] is the subprocess implementation.
//!
//! ## Command contract
//!
//! ```text
//! <tool> list    --asset_dir <dir>
//!     one logical asset path per line on stdout
//! <tool> extract --asset_dir <dir> --files <p1> <p2> ... --output <out>
//!     writes each requested asset as <out>/<basename>
//! ```
//!
//! A non-zero exit fails the whole call. So does a missing executable.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Default executable name looked up on `PATH`.
pub const DEFAULT_TOOL: &str = "TpacToolCli";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive tool not found: {0}")]
    ToolMissing(String),
    #[error("failed to run archive tool: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("archive tool `{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Lists and extracts packed assets.
///
/// Implementations must be `Sync`; the trait takes `&self` everywhere.
pub trait ArchiveTool: Sync {
    /// Logical asset paths packed under `asset_dir`.
    fn list(&self, asset_dir: &Path) -> Result<Vec<String>, ArchiveError>;

    /// Extract `assets` from `asset_dir` into `output_dir`, one file per asset
    /// named by its basename. Fails for the whole batch or not at all.
    fn extract(
        &self,
        asset_dir: &Path,
        assets: &[String],
        output_dir: &Path,
    ) -> Result<(), ArchiveError>;
}

/// Runs the archive tool as a subprocess.
#[derive(Debug, Clone)]
pub struct CliArchiveTool {
    executable: PathBuf,
}

impl CliArchiveTool {
    /// Resolve the executable: an existing path is used as-is, anything else
    /// is looked up on `PATH`.
    pub fn locate(program: &str) -> Result<Self, ArchiveError> {
        let candidate = Path::new(program);
        if candidate.is_file() {
            return Ok(Self {
                executable: candidate.to_path_buf(),
            });
        }
        which::which(program)
            .map(|executable| Self { executable })
            .map_err(|_| ArchiveError::ToolMissing(program.to_string()))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn run(&self, args: &[&OsStr]) -> Result<String, ArchiveError> {
        let subcommand = args
            .first()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::debug!(tool = %self.executable.display(), %subcommand, "running archive tool");

        let output = Command::new(&self.executable)
            .args(args)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ArchiveError::ToolMissing(self.executable.display().to_string())
                }
                _ => ArchiveError::Spawn(e),
            })?;

        if !output.status.success() {
            return Err(ArchiveError::Failed {
                command: subcommand,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ArchiveTool for CliArchiveTool {
    fn list(&self, asset_dir: &Path) -> Result<Vec<String>, ArchiveError> {
        let stdout = self.run(&[
            OsStr::new("list"),
            OsStr::new("--asset_dir"),
            asset_dir.as_os_str(),
        ])?;
        Ok(parse_listing(&stdout))
    }

    fn extract(
        &self,
        asset_dir: &Path,
        assets: &[String],
        output_dir: &Path,
    ) -> Result<(), ArchiveError> {
        if assets.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(output_dir)?;
        let mut args: Vec<&OsStr> = vec![
            OsStr::new("extract"),
            OsStr::new("--asset_dir"),
            asset_dir.as_os_str(),
            OsStr::new("--files"),
        ];
        args.extend(assets.iter().map(|a| OsStr::new(a.as_str())));
        args.push(OsStr::new("--output"));
        args.push(output_dir.as_os_str());
        self.run(&args).map(|_| ())
    }
}

/// Split `list` output into asset paths, skipping blank lines.
fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
