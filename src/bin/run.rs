use anyhow::{Context, Result};
use clap::Parser;

use safe_bench::config::{RunArgs, RunContext};
use safe_bench::runner::build_runner;
use safe_bench::utils;

fn main() -> Result<()> {
    let args = RunArgs::parse();
    let context = RunContext::load(args)?;

    // Initialize observability based on config
    // Don't drop the guard to flush logs on shutdown.
    let observability = &context.scenario.observability;
    let _guard = utils::init_logger(&observability.logging);
    utils::init_metrics(&observability.metrics, &context.args.exp_name)?;
    utils::load_env()?;

    tracing::info!("Starting {:?} run with args: {:?}", context.args.mode, context.args);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(context.args.threads.max(1))
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    rt.block_on(async move {
        let cancel_token = utils::setup_cancel_token();
        let mut runner = build_runner(context).await?;

        let result = runner.run(&cancel_token).await;
        if let Err(err) = &result {
            tracing::error!("Run failed: {:#}", err);
        }
        if let Err(err) = runner.close().await {
            tracing::error!("Failed to close runner: {:#}", err);
        }
        result
    })
}
