// End-to-end runs on the kinematic simulator with the shipped configs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use safe_bench::config::{RunArgs, RunContext};
use safe_bench::recorder::read_rows_from_disk;
use safe_bench::runner::{SelectedScene, build_runner};
use safe_bench::scoring::{EvaluationResults, Track};
use tokio_util::sync::CancellationToken;

fn output_dir() -> String {
    let name = format!("safe_bench_run_{:016x}", rand::rng().random::<u64>());
    std::env::temp_dir().join(name).to_string_lossy().into_owned()
}

/// Run the launcher with the given arguments and return the experiment directory.
async fn run(output_dir: &str, args: &[&str]) -> Result<PathBuf> {
    run_with_cancel(output_dir, args, &CancellationToken::new()).await
}

async fn run_with_cancel(
    output_dir: &str,
    args: &[&str],
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    let mut argv = vec!["run", "--output_dir", output_dir, "--max_episode_step", "20"];
    argv.extend_from_slice(args);
    let context = RunContext::load(RunArgs::try_parse_from(argv)?)?;

    let mut runner = build_runner(context).await?;
    let result = runner.run(cancel).await;
    runner.close().await?;
    result?;
    Ok(context.args.experiment_dir())
}

#[tokio::test]
async fn test_eval_writes_and_resumes_results() -> Result<()> {
    let output_dir = output_dir();
    let experiment_dir = run(&output_dir, &["--mode", "eval"]).await?;

    let results = EvaluationResults::load_or_new(&experiment_dir, Track::PlanningDefense)?;
    assert_eq!(results.planning.len(), 3);
    let summary = results.planning_summary.clone().unwrap();
    assert_eq!(summary.num_scenarios, 3);
    assert!((0.0..=1.0).contains(&summary.final_score));

    // A second run finds every scenario scored and leaves the results alone.
    run(&output_dir, &["--mode", "eval"]).await?;
    let resumed = EvaluationResults::load_or_new(&experiment_dir, Track::PlanningDefense)?;
    assert_eq!(resumed.planning, results.planning);
    Ok(())
}

#[tokio::test]
async fn test_train_agent_saves_checkpoint() -> Result<()> {
    let output_dir = output_dir();
    let experiment_dir = run(
        &output_dir,
        &["--mode", "train_agent", "--agent_cfg", "random.toml", "-s", "3"],
    )
    .await?;
    let checkpoint = experiment_dir.join("model").join("random.checkpoint.json");
    assert!(checkpoint.exists());

    // Continuing from the final checkpoint has nothing left to train.
    run(
        &output_dir,
        &["--mode", "train_agent", "--agent_cfg", "random.toml", "--continue_agent_training"],
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn test_adv_trajectory_records_trajectories() -> Result<()> {
    let output_dir = output_dir();
    let experiment_dir = run(
        &output_dir,
        &["--mode", "eval", "--scenario_cfg", "adv_trajectory.toml", "--ns", "3"],
    )
    .await?;

    let files: Vec<PathBuf> = std::fs::read_dir(experiment_dir.join("trajectories"))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    assert!(!files.is_empty());
    let rows = read_rows_from_disk(&files[0])?;
    assert!(rows.iter().any(|row| row.done));
    Ok(())
}

#[tokio::test]
async fn test_scenic_scene_selection() -> Result<()> {
    let output_dir = output_dir();
    let experiment_dir = run(
        &output_dir,
        &["--mode", "train_scenario", "--scenario_cfg", "scenic.toml", "--num_scenario", "1"],
    )
    .await?;

    let contents = std::fs::read_to_string(experiment_dir.join("selected_scenes.json"))?;
    let selected: Vec<SelectedScene> = serde_json::from_str(&contents)?;
    assert_eq!(selected.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_runs_still_save() -> Result<()> {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let output_dir = output_dir();
    let experiment_dir = run_with_cancel(&output_dir, &["--mode", "eval"], &cancel).await?;
    let results = EvaluationResults::load_or_new(&experiment_dir, Track::PlanningDefense)?;
    assert!(EvaluationResults::path(&experiment_dir).exists());
    assert!(results.planning.is_empty());
    assert!(results.planning_summary.is_none());

    let experiment_dir = run_with_cancel(
        &output_dir,
        &["--mode", "train_agent", "--agent_cfg", "random.toml"],
        &cancel,
    )
    .await?;
    let checkpoint = experiment_dir.join("model").join("random.checkpoint.json");
    assert!(checkpoint.exists());
    Ok(())
}
