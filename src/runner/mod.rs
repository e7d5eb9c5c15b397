mod base;
mod carla;
mod episode;
mod scenic;
mod simulator;

pub use base::RunnerCore;
pub use carla::CarlaRunner;
pub use episode::{EpisodeOptions, run_episode};
pub use scenic::{ScenicRunner, SelectedScene};
pub use simulator::{build_map, build_simulator};

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{RunContext, ScenarioCategory};

/// Drives a whole run in the mode chosen on the command line.
#[async_trait]
pub trait Runner: Send {
    async fn run(&mut self, cancel: &CancellationToken) -> Result<()>;

    /// Destroy remaining actors and release the simulator.
    async fn close(&mut self) -> Result<()>;
}

pub async fn build_runner(context: &'static RunContext) -> Result<Box<dyn Runner>> {
    Ok(match context.scenario.type_category {
        ScenarioCategory::Scenic => Box::new(ScenicRunner::build(context).await?),
        ScenarioCategory::Standard | ScenarioCategory::AdvTrajectory => {
            Box::new(CarlaRunner::build(context).await?)
        }
    })
}
