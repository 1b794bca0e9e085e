//! Watchpost CLI
//!
//! Performs one probe run over the configured endpoints and exits.

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use watchpost::{load_config, WatchpostBuilder};

#[derive(Parser)]
#[command(name = "watchpost")]
#[command(about = "Probe endpoints once and alert on new failures")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Number of concurrent probe workers (overrides config file)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, workers={:?}, log_level={:?}",
        args.config,
        args.workers,
        args.log_level
    );

    let mut config = load_config(&args.config)?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    tracing::info!("Starting watchpost run");
    let report = WatchpostBuilder::new(config).build().await?.run_once().await?;
    tracing::info!(
        "Run complete: {} endpoints probed, {} failures alerted",
        report.total,
        report.failures.len()
    );

    Ok(())
}
