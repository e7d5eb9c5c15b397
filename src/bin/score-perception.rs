use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use safe_bench::config::LoggingConfig;
use safe_bench::scoring::{EvaluationResults, Track};
use safe_bench::utils;

/// Score detections produced by a perception model on the benchmark scenarios.
#[derive(Parser)]
#[command()]
struct Cli {
    /// JSON file holding a list of perception records.
    #[arg(long, value_name = "FILE")]
    records: PathBuf,
    #[arg(long = "exp_name", default_value = "exp")]
    exp_name: String,
    #[arg(long = "output_dir", default_value = "log")]
    output_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = Track::PerceptionDefense)]
    track: Track,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Don't drop the guard to flush logs on shutdown.
    let _guard = utils::init_logger(&LoggingConfig::Console);
    utils::load_env()?;

    let experiment_dir = cli.output_dir.join(&cli.exp_name);
    let results =
        EvaluationResults::score_perception_file(&cli.records, &experiment_dir, cli.track)?;
    if let Some(summary) = &results.perception_summary {
        tracing::info!("Perception summary: {:?}", summary);
    }
    Ok(())
}
