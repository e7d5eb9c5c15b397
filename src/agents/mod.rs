mod base;
mod checkpoint;
mod dummy;
mod lane_keeping;
mod random;

pub use base::Agent;
pub use checkpoint::Checkpoint;
pub use dummy::DummyAgent;
pub use lane_keeping::LaneKeepingAgent;
pub use random::RandomAgent;

use crate::config::{AgentConfig, AgentPolicyConfig, LaneKeepingConfig};

/// Build the ego agent described by the config. With `auto_ego` the ego
/// vehicle is driven by the lane keeping controller instead.
pub fn build_agent(config: &AgentConfig, auto_ego: bool, seed: u64) -> Box<dyn Agent> {
    if auto_ego {
        return Box::new(LaneKeepingAgent::new(
            &config.name,
            &LaneKeepingConfig::default(),
        ));
    }
    match &config.policy {
        AgentPolicyConfig::Dummy(dummy) => Box::new(DummyAgent::new(&config.name, dummy)),
        AgentPolicyConfig::Random(random) => {
            Box::new(RandomAgent::new(&config.name, random, seed))
        }
        AgentPolicyConfig::LaneKeeping(lane_keeping) => {
            Box::new(LaneKeepingAgent::new(&config.name, lane_keeping))
        }
    }
}
