use anyhow::{Result, ensure};

use crate::env::{EgoAction, Observation, ScenarioEnv, StepOutcome};
use crate::scenario::ScenarioInstance;
use crate::scoring::PlanningRecord;
use crate::sim::{RoadMap, Simulator};

/// Runs a batch of scenario instances side by side in one simulator. Every
/// step advances the world by `frame_skip` ticks. Finished slots have their
/// actors removed and are skipped until the next reset.
pub struct VectorEnv {
    sim: Box<dyn Simulator>,
    envs: Vec<ScenarioEnv>,
    ego_blueprint: String,
    max_episode_step: u32,
    frame_skip: u32,
}

impl VectorEnv {
    pub fn new(
        sim: Box<dyn Simulator>,
        ego_blueprint: &str,
        max_episode_step: u32,
        frame_skip: u32,
    ) -> Self {
        Self {
            sim,
            envs: Vec::new(),
            ego_blueprint: ego_blueprint.to_string(),
            max_episode_step,
            frame_skip: frame_skip.max(1),
        }
    }

    pub fn map(&self) -> &RoadMap {
        self.sim.map()
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    pub fn envs(&self) -> &[ScenarioEnv] {
        &self.envs
    }

    /// Start one episode per instance; `init_actions[i]` perturbs instance `i`.
    /// Returns the initial observation of every slot.
    pub async fn reset(
        &mut self,
        instances: &[ScenarioInstance],
        init_actions: &[Vec<f64>],
    ) -> Result<Vec<Observation>> {
        ensure!(
            instances.len() == init_actions.len(),
            "Got {} init actions for {} scenarios",
            init_actions.len(),
            instances.len()
        );
        self.clean_up().await?;

        for (slot, (instance, init_action)) in instances.iter().zip(init_actions).enumerate() {
            let env = ScenarioEnv::reset(
                self.sim.as_mut(),
                slot,
                instance.clone(),
                init_action,
                &self.ego_blueprint,
                self.max_episode_step,
            )
            .await?;
            self.envs.push(env);
        }
        self.sim.tick().await?;

        let sim = self.sim.as_ref();
        self.envs
            .iter_mut()
            .map(|env| env.observe_reset(sim))
            .collect()
    }

    /// Advance all running slots by one step. `actions` holds one action per
    /// slot; actions of finished slots are ignored. Returns the outcome of
    /// every slot that was still running.
    pub async fn step(&mut self, actions: &[EgoAction]) -> Result<Vec<StepOutcome>> {
        ensure!(
            actions.len() == self.envs.len(),
            "Got {} actions for {} scenarios",
            actions.len(),
            self.envs.len()
        );
        let running: Vec<usize> = (0..self.envs.len())
            .filter(|&slot| !self.envs[slot].is_done())
            .collect();

        for &slot in &running {
            self.envs[slot].apply(self.sim.as_mut(), &actions[slot]).await?;
        }

        let mut collided = vec![false; self.envs.len()];
        for _ in 0..self.frame_skip {
            let snapshot = self.sim.tick().await?;
            for &slot in &running {
                collided[slot] |= snapshot.collided(self.envs[slot].ego());
            }
        }

        let mut outcomes = Vec::with_capacity(running.len());
        for &slot in &running {
            let outcome = self.envs[slot].observe(self.sim.as_ref(), collided[slot])?;
            if outcome.done {
                tracing::debug!(
                    "Scenario {} in slot {} finished",
                    self.envs[slot].instance().scenario_id,
                    slot
                );
                self.envs[slot].clean_up(self.sim.as_mut()).await?;
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    pub fn all_done(&self) -> bool {
        self.envs.iter().all(ScenarioEnv::is_done)
    }

    /// Observations of every slot, the latest one for finished slots.
    pub fn observations(&self) -> Vec<Observation> {
        self.envs.iter().map(|env| *env.observation()).collect()
    }

    pub fn records(&self) -> Vec<PlanningRecord> {
        self.envs.iter().map(ScenarioEnv::record).collect()
    }

    /// Remove the actors of slots that are still running and forget all slots.
    pub async fn clean_up(&mut self) -> Result<()> {
        for env in &mut self.envs {
            if !env.is_done() {
                env.clean_up(self.sim.as_mut()).await?;
            }
        }
        self.envs.clear();
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        if let Err(err) = self.clean_up().await {
            tracing::warn!("Failed to clean up scenarios on close: {:#}", err);
        }
        self.envs.clear();
        self.sim.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriggerPoint;
    use crate::sim::KinematicSimulator;
    use crate::testing;

    fn vector_env(max_episode_step: u32, frame_skip: u32) -> VectorEnv {
        let map = RoadMap::straight_road(3, 600.0, 3.5).unwrap();
        VectorEnv::new(
            Box::new(KinematicSimulator::new(map, 0.1)),
            "vehicle.lincoln.mkz_2017",
            max_episode_step,
            frame_skip,
        )
    }

    fn instances() -> Vec<ScenarioInstance> {
        (0..2)
            .map(|i| {
                let mut instance = testing::instance(i);
                instance.trigger_point = TriggerPoint {
                    lane_id: 0,
                    s: 10.0 + 250.0 * i as f64,
                };
                instance
            })
            .collect()
    }

    #[tokio::test]
    async fn test_runs_batch_until_done() {
        let mut env = vector_env(4, 2);
        let obs = env.reset(&instances(), &[vec![], vec![]]).await.unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(env.num_envs(), 2);

        let mut steps = 0;
        while !env.all_done() {
            let outcomes = env.step(&[EgoAction::new(0.5, 0.0); 2]).await.unwrap();
            assert_eq!(outcomes.len(), 2);
            steps += 1;
        }
        assert_eq!(steps, 4);
        assert!(env.records().iter().all(|r| (r.running_time - 0.8).abs() < 1e-9));

        // Finished slots are already cleaned up.
        env.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_action_count_must_match() {
        let mut env = vector_env(4, 1);
        env.reset(&instances(), &[vec![], vec![]]).await.unwrap();
        assert!(env.step(&[EgoAction::default()]).await.is_err());
        env.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_replaces_previous_batch() {
        let mut env = vector_env(100, 1);
        env.reset(&instances(), &[vec![], vec![]]).await.unwrap();
        env.reset(&instances()[..1], &[vec![]]).await.unwrap();
        assert_eq!(env.num_envs(), 1);
        assert_eq!(env.sim.snapshot().actors.len(), 2);
        env.close().await.unwrap();
    }
}
