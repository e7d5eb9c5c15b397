use std::path::Path;

use anyhow::Result;

use crate::agents::Checkpoint;
use crate::buffer::ReplayBuffer;
use crate::env::{EgoAction, Observation};

/// An ego driving policy under evaluation.
pub trait Agent: Send {
    fn name(&self) -> &str;

    /// Choose the next action. `deterministic` is set during evaluation.
    fn get_action(&mut self, obs: &Observation, deterministic: bool) -> EgoAction;

    /// One training update from the replay buffer.
    fn train(&mut self, _buffer: &ReplayBuffer) -> Result<()> {
        Ok(())
    }

    fn save_model(&self, directory: &Path, episode: u32) -> Result<()> {
        Checkpoint {
            name: self.name().to_string(),
            episode,
        }
        .save(directory)
    }

    /// Restore a saved model and return the episode to continue from.
    fn load_model(&mut self, directory: &Path) -> Result<Option<u32>> {
        Ok(Checkpoint::load(directory, self.name())?.map(|c| c.episode))
    }
}
