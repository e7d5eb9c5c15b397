use crate::agents::Agent;
use crate::config::DummyConfig;
use crate::env::{EgoAction, Observation};

/// Always returns the same action.
pub struct DummyAgent {
    name: String,
    action: EgoAction,
}

impl DummyAgent {
    pub fn new(name: &str, config: &DummyConfig) -> Self {
        Self {
            name: name.to_string(),
            action: EgoAction::new(config.acceleration, config.steering),
        }
    }
}

impl Agent for DummyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_action(&mut self, _obs: &Observation, _deterministic: bool) -> EgoAction {
        self.action
    }
}
