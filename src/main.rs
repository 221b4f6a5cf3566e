use std::path::PathBuf;

use clap::Parser;
use costbook::collect::Collector;
use costbook::config::{Config, DEFAULT_CONFIG_FILE};
use costbook::{CollectError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)?;
    if let Some(src) = cli.src {
        config.src_dir = src;
    }
    if let Some(dst) = cli.dst {
        config.dst_dir = dst;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if cli.sequential {
        config.concurrent = false;
    }

    init_logging(&config.log_level)?;

    let report = Collector::new(config).run()?;
    for outcome in &report.outcomes {
        if outcome.succeeded() {
            println!("task[{}]: ok, {} rows", outcome.task, outcome.rows);
        } else {
            println!("task[{}]: failed", outcome.task);
        }
    }

    match report.into_first_error() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| CollectError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Consolidate monthly spreadsheet reports into one cost-ledger workbook."
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Source directory holding the monthly report workbooks.
    #[arg(long)]
    src: Option<PathBuf>,

    /// Destination directory for the consolidated workbook.
    #[arg(long)]
    dst: Option<PathBuf>,

    /// Run tasks one at a time instead of concurrently.
    #[arg(long)]
    sequential: bool,

    /// Log verbosity (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}
