use std::path::Path;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agents::Checkpoint;
use crate::buffer::ReplayBuffer;
use crate::config::{ScenarioConfig, ScenarioPolicyConfig};
use crate::scenario::ScenarioInstance;

/// Chooses the initial perturbation of each scenario instance. Adversarial
/// policies learn to pick perturbations that make the ego vehicle fail.
pub trait ScenarioPolicy: Send {
    fn name(&self) -> &str;

    fn get_init_action(
        &mut self,
        instance: &ScenarioInstance,
        static_obs: &[f32],
        deterministic: bool,
    ) -> Vec<f64>;

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

    fn load_model(&mut self, directory: &Path) -> Result<Option<u32>> {
        Ok(Checkpoint::load(directory, self.name())?.map(|c| c.episode))
    }
}

/// Replays the parameters stored with each instance.
pub struct FixedParameters;

impl ScenarioPolicy for FixedParameters {
    fn name(&self) -> &str {
        "fixed_parameters"
    }

    fn get_init_action(
        &mut self,
        instance: &ScenarioInstance,
        _static_obs: &[f32],
        _deterministic: bool,
    ) -> Vec<f64> {
        instance.parameters.clone()
    }
}

/// Samples every parameter uniformly in [0, 1]. Deterministic requests fall
/// back to the stored parameters so evaluation stays reproducible.
pub struct RandomParameters {
    num_parameters: usize,
    rng: StdRng,
}

impl RandomParameters {
    pub fn new(num_parameters: usize, seed: u64) -> Self {
        Self {
            num_parameters,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ScenarioPolicy for RandomParameters {
    fn name(&self) -> &str {
        "random_parameters"
    }

    fn get_init_action(
        &mut self,
        instance: &ScenarioInstance,
        _static_obs: &[f32],
        deterministic: bool,
    ) -> Vec<f64> {
        if deterministic && !instance.parameters.is_empty() {
            return instance.parameters.clone();
        }
        (0..self.num_parameters)
            .map(|_| self.rng.random_range(0.0..=1.0))
            .collect()
    }
}

pub fn build_scenario_policy(config: &ScenarioConfig, seed: u64) -> Box<dyn ScenarioPolicy> {
    match config.policy {
        ScenarioPolicyConfig::Fixed => Box::new(FixedParameters),
        ScenarioPolicyConfig::Random { num_parameters } => {
            Box::new(RandomParameters::new(num_parameters, seed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_fixed_parameters() {
        let mut instance = testing::instance(0);
        instance.parameters = vec![0.2, 0.8];
        let mut policy = FixedParameters;
        let obs = instance.static_observation();
        assert_eq!(policy.get_init_action(&instance, &obs, false), vec![0.2, 0.8]);
    }

    #[test]
    fn test_random_parameters() {
        let instance = testing::instance(0);
        let obs = instance.static_observation();
        let mut policy = RandomParameters::new(6, 7);
        let action = policy.get_init_action(&instance, &obs, false);
        assert_eq!(action.len(), 6);
        assert!(action.iter().all(|p| (0.0..=1.0).contains(p)));

        let mut same_seed = RandomParameters::new(6, 7);
        assert_eq!(same_seed.get_init_action(&instance, &obs, false), action);
    }

    #[test]
    fn test_random_parameters_deterministic_uses_stored() {
        let mut instance = testing::instance(0);
        instance.parameters = vec![0.5; 3];
        let obs = instance.static_observation();
        let mut policy = RandomParameters::new(6, 7);
        assert_eq!(policy.get_init_action(&instance, &obs, true), vec![0.5; 3]);
    }
}
