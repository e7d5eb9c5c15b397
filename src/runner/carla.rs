use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{Mode, RunContext};
use crate::runner::{Runner, RunnerCore};

/// Runs scripted and adversarial trajectory scenarios, several at a time.
pub struct CarlaRunner {
    mode: Mode,
    core: RunnerCore,
}

impl CarlaRunner {
    pub async fn build(context: &'static RunContext) -> Result<Self> {
        Ok(Self {
            mode: context.args.mode,
            core: RunnerCore::build(context).await?,
        })
    }
}

#[async_trait]
impl Runner for CarlaRunner {
    async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        match self.mode {
            Mode::Eval => self.core.eval(cancel).await,
            Mode::TrainAgent | Mode::TrainScenario => self.core.train(cancel).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.core.close().await
    }
}
