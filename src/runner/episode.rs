use std::collections::BTreeMap;

use anyhow::Result;

use crate::agents::Agent;
use crate::buffer::{ReplayBuffer, Transition};
use crate::env::{EgoAction, VectorEnv};
use crate::recorder::{TrajectoryRecorder, TrajectoryRow};
use crate::scenario::ScenarioInstance;
use crate::scoring::PlanningRecord;

#[derive(Debug, Clone, Copy)]
pub struct EpisodeOptions {
    /// Episode counter, stamped on recorded rows.
    pub episode: u32,
    /// Ask the agent for deterministic actions.
    pub deterministic: bool,
    /// Run an agent training update after every step.
    pub train_agent_on_step: bool,
}

/// Drive one batch of scenarios until every slot is done and return the
/// planning record of each slot. Transitions go to the buffer and the
/// recorder when they are given.
pub async fn run_episode(
    env: &mut VectorEnv,
    agent: &mut dyn Agent,
    instances: &[ScenarioInstance],
    init_actions: &[Vec<f64>],
    options: EpisodeOptions,
    mut buffer: Option<&mut ReplayBuffer>,
    recorder: Option<&TrajectoryRecorder>,
) -> Result<Vec<PlanningRecord>> {
    let mut obs = env.reset(instances, init_actions).await?;
    metrics::counter!("episodes_started_total").increment(instances.len() as u64);
    let scenario_actions: Vec<Vec<f32>> = init_actions
        .iter()
        .map(|action| action.iter().map(|&p| p as f32).collect())
        .collect();

    let mut step = 0;
    while !env.all_done() {
        let actions: Vec<EgoAction> = env
            .envs()
            .iter()
            .zip(&obs)
            .map(|(scenario_env, o)| {
                if scenario_env.is_done() {
                    EgoAction::default()
                } else {
                    agent.get_action(o, options.deterministic)
                }
            })
            .collect();

        let outcomes = env.step(&actions).await?;
        metrics::counter!("env_steps_total").increment(outcomes.len() as u64);

        let mut transitions = Vec::with_capacity(outcomes.len());
        let mut rows = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let slot = outcome.slot;
            if outcome.info.collision {
                metrics::counter!("collisions_total").increment(1);
            }
            let transition = Transition {
                slot,
                ego_action: actions[slot].to_vec(),
                scenario_action: scenario_actions[slot].clone(),
                obs: obs[slot].to_vec(),
                next_obs: outcome.obs.to_vec(),
                reward: outcome.reward as f32,
                done: outcome.done,
                additional: BTreeMap::from([("cost".to_string(), outcome.info.cost)]),
            };
            if recorder.is_some() {
                rows.push(TrajectoryRow {
                    episode: options.episode,
                    scenario_id: outcome.info.scenario_id,
                    slot,
                    step,
                    obs: transition.obs.clone(),
                    ego_action: transition.ego_action.clone(),
                    next_obs: transition.next_obs.clone(),
                    reward: transition.reward,
                    done: transition.done,
                    collision: outcome.info.collision,
                    out_of_road: outcome.info.out_of_road,
                    cost: outcome.info.cost,
                });
            }
            transitions.push(transition);
            obs[slot] = outcome.obs;
        }

        if let Some(buffer) = buffer.as_deref_mut() {
            buffer.store(transitions)?;
            if options.train_agent_on_step {
                agent.train(buffer)?;
            }
        }
        if let Some(recorder) = recorder {
            metrics::counter!("trajectory_rows_published_total").increment(rows.len() as u64);
            recorder.push_rows(rows)?;
        }
        step += 1;
    }

    metrics::counter!("episodes_finished_total").increment(instances.len() as u64);
    Ok(env.records())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::DummyAgent;
    use crate::config::{DummyConfig, Mode};
    use crate::sim::{KinematicSimulator, RoadMap};
    use crate::testing;

    #[tokio::test]
    async fn test_episode_fills_buffer() {
        let map = RoadMap::straight_road(2, 600.0, 3.5).unwrap();
        let mut env = VectorEnv::new(
            Box::new(KinematicSimulator::new(map, 0.1)),
            "vehicle.lincoln.mkz_2017",
            5,
            1,
        );
        let mut agent = DummyAgent::new(
            "dummy",
            &DummyConfig {
                acceleration: 0.3,
                steering: 0.0,
            },
        );
        let mut buffer = ReplayBuffer::new(1, Mode::TrainAgent, 100);
        let options = EpisodeOptions {
            episode: 0,
            deterministic: false,
            train_agent_on_step: true,
        };

        let records = run_episode(
            &mut env,
            &mut agent,
            &[testing::instance(0)],
            &[vec![]],
            options,
            Some(&mut buffer),
            None,
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scenario_id, 0);
        assert!(!records[0].collided);
        assert_eq!(buffer.len(), 5);
        env.close().await.unwrap();
    }
}
