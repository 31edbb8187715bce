//! tilereg CLI: register every configured tile and round.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tilereg::{PipelineConfig, ThresholdExtractor, TileRegistrator};

#[derive(Parser)]
#[command(name = "tilereg")]
#[command(about = "Landmark-based multi-round registration of tiled microscopy images")]
#[command(version)]
struct Cli {
    /// Run configuration (YAML).
    #[arg(long)]
    config: PathBuf,

    /// Override the number of tiles processed concurrently.
    #[arg(long)]
    workers: Option<usize>,

    /// Base log filter; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory for rolling log files.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    common::log_setup::setup_logging(&cli.log_level, &cli.log_dir, "tilereg");

    let mut config = PipelineConfig::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if let Some(workers) = cli.workers {
        config.workers = workers;
        config.validate().context("invalid --workers override")?;
    }

    let extractor = ThresholdExtractor::new(config.landmarks.clone());
    let registrator = TileRegistrator::new(config, extractor);
    let summary = registrator.run().context("registration run failed")?;

    println!(
        "Registered {} round(s) over {} tile(s) ({} tile(s) and {} round(s) skipped)",
        summary.rounds_registered,
        summary.tiles_processed,
        summary.tiles_skipped,
        summary.rounds_skipped,
    );
    println!("Quality log: {}", summary.quality_log.display());
    Ok(())
}
