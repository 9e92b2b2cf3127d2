//! Repertoire - interactive client directory
//!
//! Opens (or creates) the fixed-width data file and runs the menu shell on
//! stdin/stdout. Logs go to stderr.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use repertoire_engine::{FileStore, RepertoireError};

mod config;
mod shell;

use config::{Config, Overrides};
use shell::Shell;

/// Repertoire - fixed-width client directory
#[derive(Parser, Debug)]
#[command(name = "repertoire")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data file holding the client records
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Width in bytes of each name field (must match the data file)
    #[arg(long)]
    name_width: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("repertoire: {:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::resolve(
        args.config.as_deref(),
        Overrides {
            data_file: args.data_file,
            name_width: args.name_width,
            log_level: args.log_level,
        },
    )?;

    // Set up logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level())
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting repertoire v{}", env!("CARGO_PKG_VERSION"));
    info!("Data file: {}", config.data_file.display());
    info!("Name width: {} bytes", config.layout.name_width);

    let mut store = FileStore::open_or_create(&config.data_file, config.layout)
        .map_err(|e| {
            error!("Cannot open or create {}: {}", config.data_file.display(), e);
            e
        })
        .with_context(|| format!("cannot open data file {}", config.data_file.display()))?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    Shell::new(&mut store, stdin.lock(), stdout.lock()).run()?;

    store.sync()?;
    info!("Shutdown complete");
    Ok(())
}

/// Process status for a failed run: the store status code when there is one
fn exit_status(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<RepertoireError>())
        .map(|err| err.status_code().as_raw())
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}
