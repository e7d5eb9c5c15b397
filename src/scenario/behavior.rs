use anyhow::Result;
use async_trait::async_trait;

use crate::sim::{ActorId, Simulator, Snapshot};

/// The scripted or adversarial traffic of one scenario.
#[async_trait]
pub trait ScenarioBehavior: Send {
    fn name(&self) -> &str;

    /// Spawn the scenario's actors.
    async fn initialize_actors(&mut self, sim: &mut dyn Simulator) -> Result<()>;

    /// Issue commands to the scenario's actors. Called once per step, before
    /// the simulator ticks.
    async fn update_behavior(&mut self, sim: &mut dyn Simulator) -> Result<()>;

    /// Whether the scenario has played out.
    fn check_stop_condition(&self, _snapshot: &Snapshot) -> bool {
        false
    }

    fn actors(&self) -> &[ActorId];

    /// Remove the scenario's actors from the world.
    async fn clean_up(&mut self, sim: &mut dyn Simulator) -> Result<()> {
        for &id in self.actors() {
            if let Err(err) = sim.destroy_actor(id).await {
                tracing::warn!("Failed to destroy actor {} of {}: {:#}", id, self.name(), err);
            }
        }
        Ok(())
    }
}
