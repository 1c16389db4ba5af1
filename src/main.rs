use clap::{Parser, Subcommand};
use std::path::PathBuf;
use texproc::archive::CliArchiveTool;
use texproc::config::{self, DataLayout, ProcessingConfig};
use texproc::database::AssetDatabase;
use texproc::imaging::{MaxDimension, TargetFormat};
use texproc::{install, load_order, output, process, scan, stage, status};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "texproc")]
#[command(about = "Downscale and recompress Bannerlord mod textures, reversibly")]
#[command(long_about = "\
Downscale and recompress Bannerlord mod textures, reversibly

Typical session:

  texproc set-game-root \"C:/Games/Mount & Blade II Bannerlord\"
  texproc set-resize 2048
  texproc set-format BC7
  texproc scan        # build the asset database, stage originals
  texproc process     # resize + block-compress into data/processed/
  texproc apply       # install into the mod tree
  texproc revert      # put everything back

Loose textures are overwritten in place and restored from data/originals/.
Textures packed in .tpac archives are installed into the
zzTextureProcessorOverride module and deleted again on revert.

Run 'texproc gen-config' to print a documented settings.toml.")]
#[command(version)]
struct Cli {
    /// Data directory (settings, database, staged originals, outputs)
    #[arg(long, default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Log pipeline details to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show settings and the state of the data directory
    Status,
    /// Set the maximum texture dimension (4096, 2048, 1024 or 512)
    SetResize {
        #[arg(value_parser = parse_max_dimension)]
        max_dimension: MaxDimension,
    },
    /// Set the output format (BC1, BC2, BC3 or BC7)
    SetFormat { format: TargetFormat },
    /// Set the game installation directory
    SetGameRoot { path: PathBuf },
    /// Build the asset database and stage original textures
    Scan {
        /// Rescan even though an apply has not been reverted
        #[arg(long)]
        force: bool,
        /// Launcher mod configuration (defaults to the launcher's own)
        #[arg(long)]
        load_order: Option<PathBuf>,
    },
    /// Resize and recompress all staged originals
    Process {
        /// Disable the transform cache and re-encode everything
        #[arg(long)]
        no_cache: bool,
        /// Worker count (clamped to the number of cores)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Install processed textures into the game tree
    Apply,
    /// Undo an apply
    Revert,
    /// Print a stock settings.toml with all options documented
    GenConfig,
}

fn parse_max_dimension(s: &str) -> Result<MaxDimension, String> {
    let value: u32 = s.trim_end_matches("px").parse().map_err(|e| format!("{e}"))?;
    MaxDimension::try_from(value)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let layout = DataLayout::new(&cli.data_dir);
    let settings = config::load_settings(layout.root())?;

    let failed = match cli.command {
        Command::Status => {
            output::print_status(&status::gather(&layout, &settings));
            false
        }
        Command::SetResize { max_dimension } => {
            let value = toml::Value::Integer(i64::from(max_dimension.value()));
            config::set_value(layout.root(), "resize", "max_dimension", value)?;
            println!("Max dimension set to {}", max_dimension);
            false
        }
        Command::SetFormat { format } => {
            let value = toml::Value::String(format.to_string());
            config::set_value(layout.root(), "resize", "format", value)?;
            println!("Format set to {}", format);
            false
        }
        Command::SetGameRoot { path } => {
            if !path.join("Modules").is_dir() {
                tracing::warn!(path = %path.display(), "no Modules folder under game root");
            }
            let value = toml::Value::String(path.display().to_string());
            config::set_value(layout.root(), "paths", "game_root", value)?;
            println!("Game root set to {}", path.display());
            false
        }
        Command::Scan { force, load_order } => {
            scan::ensure_no_pending_apply(layout.root(), force)?;
            let game_root = settings.game_root()?;
            let load_order_path = load_order
                .or_else(|| settings.paths.load_order.clone())
                .or_else(load_order::default_load_order_path)
                .ok_or("no load order file found; pass --load-order")?;
            let mod_order = load_order::read_load_order(&load_order_path);
            let tool = CliArchiveTool::locate(settings.archive_tool())?;

            println!("==> Scanning {}", game_root.display());
            let report = scan::build(&mod_order, game_root, &tool)?;
            output::print_scan_report(&report);
            report.database.save(&layout.database())?;

            println!("==> Staging originals");
            let staged = stage::stage(&report.database, &layout.originals(), &tool)?;
            output::print_stage_report(&staged, report.database.len());
            !report.failures.is_empty() || !staged.failures.is_empty()
        }
        Command::Process { no_cache, workers } => {
            let transform_settings = settings.transform_settings()?;
            let workers = match workers {
                Some(n) => config::effective_threads(&ProcessingConfig {
                    max_processes: Some(n),
                }),
                None => config::effective_threads(&settings.processing),
            };
            let options = process::ProcessOptions {
                workers,
                use_cache: !no_cache,
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let report = process::transform(
                &layout.originals(),
                &layout.processed(),
                &transform_settings,
                &options,
                Some(tx),
            )?;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            output::print_process_summary(&report);
            report.failed() > 0
        }
        Command::Apply => {
            let db = AssetDatabase::load(&layout.database())?;
            let report = install::apply(&db, &layout.processed(), &layout.originals());
            if !report.changed.is_empty() {
                install::write_apply_marker(layout.root(), &report.changed)?;
            }
            output::print_install_report("Applied", &report, db.len());
            !report.failures.is_empty()
        }
        Command::Revert => {
            let db = AssetDatabase::load(&layout.database())?;
            let report = install::revert(&db, &layout.originals());
            if report.failures.is_empty() {
                install::clear_apply_marker(layout.root())?;
            }
            output::print_revert_report(&report, db.len());
            !report.failures.is_empty()
        }
        Command::GenConfig => {
            print!("{}", config::stock_settings_toml());
            false
        }
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Route `tracing` to stderr. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "texproc=debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}
