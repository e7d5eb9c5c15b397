use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::{Mode, RunContext};
use crate::runner::{Runner, RunnerCore};
use crate::scenario::ScenarioSource;
use crate::scoring::PlanningRecord;

const SELECTED_SCENES_FILE_NAME: &str = "selected_scenes.json";

/// A scene ranked by how hard it was for the ego agent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SelectedScene {
    pub scenario_id: usize,
    pub name: String,
    pub collided: bool,
    pub episode_reward: f64,
}

/// Runs scenes sampled from Scenic programs, one at a time. Training a
/// scenario here means ranking the sampled scenes by how adversarial they
/// are for the ego agent.
pub struct ScenicRunner {
    context: &'static RunContext,
    core: RunnerCore,
}

impl ScenicRunner {
    pub async fn build(context: &'static RunContext) -> Result<Self> {
        Ok(Self {
            context,
            core: RunnerCore::build(context).await?,
        })
    }

    async fn select_scenes(&mut self, cancel: &CancellationToken) -> Result<()> {
        let records = self.core.evaluate(cancel).await?;
        let selected = rank_scenes(&records, |scenario_id| {
            self.core
                .instances()
                .iter()
                .find(|instance| instance.scenario_id == scenario_id)
                .map(|instance| match &instance.source {
                    ScenarioSource::Scenic(scene) => scene.name.clone(),
                    ScenarioSource::Scripted(_) => instance.name(),
                })
                .unwrap_or_default()
        });
        let experiment_dir = self.context.args.experiment_dir();
        save_selected_scenes(&selected, &experiment_dir)?;
        if let Some(hardest) = selected.first() {
            tracing::info!(
                "Ranked {} scenes, hardest is {} with reward {:.2}",
                selected.len(),
                hardest.name,
                hardest.episode_reward
            );
        }
        Ok(())
    }
}

/// Collisions first, then lowest ego reward.
fn rank_scenes(
    records: &[PlanningRecord],
    scene_name: impl Fn(usize) -> String,
) -> Vec<SelectedScene> {
    records
        .iter()
        .map(|record| SelectedScene {
            scenario_id: record.scenario_id,
            name: scene_name(record.scenario_id),
            collided: record.collided,
            episode_reward: record.episode_reward,
        })
        .sorted_by(|a, b| match b.collided.cmp(&a.collided) {
            Ordering::Equal => a.episode_reward.total_cmp(&b.episode_reward),
            ordering => ordering,
        })
        .collect()
}

fn save_selected_scenes(selected: &[SelectedScene], experiment_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(experiment_dir)
        .with_context(|| format!("Failed to create directory {}", experiment_dir.display()))?;
    let path = experiment_dir.join(SELECTED_SCENES_FILE_NAME);
    std::fs::write(&path, serde_json::to_string_pretty(selected)?)
        .with_context(|| format!("Failed to write selected scenes to {}", path.display()))
}

#[async_trait]
impl Runner for ScenicRunner {
    async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        match self.context.args.mode {
            Mode::Eval => self.core.eval(cancel).await,
            Mode::TrainAgent => self.core.train(cancel).await,
            Mode::TrainScenario => self.select_scenes(cancel).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.core.close().await
    }
}
