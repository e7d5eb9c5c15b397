use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agents::Agent;
use crate::config::RandomConfig;
use crate::env::{EgoAction, Observation};

pub struct RandomAgent {
    name: String,
    forward_only: bool,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(name: &str, config: &RandomConfig, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            forward_only: config.forward_only,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_action(&mut self, _obs: &Observation, _deterministic: bool) -> EgoAction {
        let low = if self.forward_only { 0.0 } else { -1.0 };
        EgoAction::new(
            self.rng.random_range(low..=1.0),
            self.rng.random_range(-1.0..=1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_actions_in_range() {
        let mut agent = RandomAgent::new("random", &RandomConfig { forward_only: true }, 3);
        let obs = testing::observation();
        for _ in 0..100 {
            let action = agent.get_action(&obs, false);
            assert!((0.0..=1.0).contains(&action.acceleration));
            assert!((-1.0..=1.0).contains(&action.steering));
        }
    }

    #[test]
    fn test_same_seed_same_actions() {
        let config = RandomConfig::default();
        let obs = testing::observation();
        let mut a = RandomAgent::new("a", &config, 11);
        let mut b = RandomAgent::new("b", &config, 11);
        for _ in 0..10 {
            assert_eq!(a.get_action(&obs, false), b.get_action(&obs, false));
        }
    }
}
