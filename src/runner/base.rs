use std::path::{Path, PathBuf};

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tokio_util::sync::CancellationToken;

use crate::agents::{Agent, build_agent};
use crate::buffer::{InitTransition, ReplayBuffer};
use crate::config::{Mode, RunContext, TrainingConfig, TrajectoryRecorderConfig};
use crate::env::VectorEnv;
use crate::recorder::TrajectoryRecorder;
use crate::runner::episode::{EpisodeOptions, run_episode};
use crate::runner::simulator::build_simulator;
use crate::scenario::{
    ScenarioInstance, ScenarioPolicy, batches, build_scenario_policy, load_instances,
};
use crate::scoring::{EvaluationResults, PlanningRecord, PlanningSummary};

/// State shared by the runners: the vectorized environment, the ego agent,
/// the scenario policy and the scenario instances of the run.
pub struct RunnerCore {
    context: &'static RunContext,
    env: VectorEnv,
    agent: Box<dyn Agent>,
    policy: Box<dyn ScenarioPolicy>,
    instances: Vec<ScenarioInstance>,
    recorder: Option<TrajectoryRecorder>,
    rng: StdRng,
}

impl RunnerCore {
    pub async fn build(context: &'static RunContext) -> Result<Self> {
        let args = &context.args;
        let instances = load_instances(context)?;
        let sim = build_simulator(context).await?;
        let env = VectorEnv::new(
            sim,
            &context.scenario.ego.blueprint,
            args.max_episode_step,
            args.frame_skip,
        );

        let recorder = match &context.scenario.trajectory_recorder {
            TrajectoryRecorderConfig::Disabled => None,
            TrajectoryRecorderConfig::Directory {
                data_directory,
                flush_row_count,
            } => Some(TrajectoryRecorder::build_and_start(
                *flush_row_count,
                args.experiment_dir().join(data_directory),
            )?),
        };

        if args.device != "cpu" {
            tracing::warn!("Baseline agents run on the CPU, ignoring device {}", args.device);
        }

        Ok(Self {
            context,
            env,
            agent: build_agent(context.agent, args.auto_ego, args.seed),
            policy: build_scenario_policy(context.scenario, args.seed.wrapping_add(1)),
            instances,
            recorder,
            rng: StdRng::seed_from_u64(args.seed.wrapping_add(2)),
        })
    }

    pub fn instances(&self) -> &[ScenarioInstance] {
        &self.instances
    }

    fn model_dir(&self, training: &TrainingConfig) -> PathBuf {
        self.context.args.experiment_dir().join(&training.model_path)
    }

    fn agent_model_dir(&self) -> PathBuf {
        self.model_dir(&self.context.agent.training)
    }

    fn policy_model_dir(&self) -> PathBuf {
        self.model_dir(&self.context.scenario.training)
    }

    /// Run one batch. In scenario training the initial conditions are also
    /// stored in the buffer.
    async fn run_batch(
        &mut self,
        batch: &[ScenarioInstance],
        deterministic_policy: bool,
        options: EpisodeOptions,
        mut buffer: Option<&mut ReplayBuffer>,
    ) -> Result<Vec<PlanningRecord>> {
        let init_actions: Vec<Vec<f64>> = batch
            .iter()
            .map(|instance| {
                self.policy.get_init_action(
                    instance,
                    &instance.static_observation(),
                    deterministic_policy,
                )
            })
            .collect();

        if let (Some(buffer), Mode::TrainScenario) =
            (buffer.as_deref_mut(), self.context.args.mode)
        {
            buffer.store_init(
                batch
                    .iter()
                    .zip(&init_actions)
                    .enumerate()
                    .map(|(slot, (instance, action))| InitTransition {
                        slot,
                        static_obs: instance.static_observation(),
                        init_action: action.iter().map(|&p| p as f32).collect(),
                        additional: Default::default(),
                    })
                    .collect(),
            )?;
        }

        run_episode(
            &mut self.env,
            self.agent.as_mut(),
            batch,
            &init_actions,
            options,
            buffer,
            self.recorder.as_ref(),
        )
        .await
    }

    /// Run every instance once with deterministic agent and policy.
    pub async fn evaluate(&mut self, cancel: &CancellationToken) -> Result<Vec<PlanningRecord>> {
        let mut records = Vec::new();
        let instances = self.instances.clone();
        for (episode, batch) in batches(&instances, self.context.args.num_scenario)
            .into_iter()
            .enumerate()
        {
            if cancel.is_cancelled() {
                break;
            }
            let options = EpisodeOptions {
                episode: episode as u32,
                deterministic: true,
                train_agent_on_step: false,
            };
            records.extend(self.run_batch(&batch, true, options, None).await?);
        }
        Ok(records)
    }

    /// Score every instance not scored yet, writing the results after each
    /// batch so an interrupted evaluation can resume.
    pub async fn eval(&mut self, cancel: &CancellationToken) -> Result<()> {
        let context = self.context;
        let args = &context.args;
        let experiment_dir = args.experiment_dir();
        self.agent.load_model(&self.agent_model_dir())?;
        self.policy.load_model(&self.policy_model_dir())?;

        let mut results = EvaluationResults::load_or_new(&experiment_dir, context.scenario.track)?;
        let scored = results.scored_scenarios();
        let pending: Vec<ScenarioInstance> = self
            .instances
            .iter()
            .filter(|instance| !scored.contains(&instance.scenario_id))
            .cloned()
            .collect();
        tracing::info!(
            "Evaluating {} of {} scenarios",
            pending.len(),
            self.instances.len()
        );

        for (episode, batch) in batches(&pending, args.num_scenario).into_iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!("Evaluation cancelled, partial results are saved");
                break;
            }
            let options = EpisodeOptions {
                episode: episode as u32,
                deterministic: true,
                train_agent_on_step: false,
            };
            for record in self.run_batch(&batch, true, options, None).await? {
                tracing::info!(
                    "Scenario {}: collided {}, route completion {:.2}, reward {:.2}",
                    record.scenario_id,
                    record.collided,
                    record.route_completion,
                    record.episode_reward
                );
                metrics::counter!("scenarios_scored_total").increment(1);
                results.add_planning(record);
            }
            results.summarize();
            results.save(&experiment_dir)?;
        }

        results.summarize();
        results.save(&experiment_dir)?;
        if let Some(summary) = &results.planning_summary {
            tracing::info!("Evaluation summary: {:?}", summary);
        }
        Ok(())
    }

    /// Train the ego agent or the scenario policy, depending on the mode.
    pub async fn train(&mut self, cancel: &CancellationToken) -> Result<()> {
        let context = self.context;
        let args = &context.args;
        let train_agent = args.mode == Mode::TrainAgent;
        let (training, continue_training) = if train_agent {
            (&context.agent.training, args.continue_agent_training)
        } else {
            (&context.scenario.training, args.continue_scenario_training)
        };
        let model_dir = self.model_dir(training);

        let mut start_episode = 0;
        if train_agent {
            if continue_training {
                start_episode = self.agent.load_model(&model_dir)?.unwrap_or(0);
            }
        } else {
            // The ego agent under attack is fixed during scenario training.
            self.agent.load_model(&self.agent_model_dir())?;
            if continue_training {
                start_episode = self.policy.load_model(&model_dir)?.unwrap_or(0);
            }
        }
        tracing::info!(
            "Training {} from episode {} to {}",
            if train_agent { self.agent.name() } else { self.policy.name() },
            start_episode,
            training.train_episode
        );

        let mut buffer = ReplayBuffer::new(args.num_scenario, args.mode, training.buffer_capacity);
        let batch_size = args.num_scenario.min(self.instances.len());
        let mut trained = start_episode;
        for episode in start_episode..training.train_episode {
            if cancel.is_cancelled() {
                tracing::warn!("Training cancelled at episode {}", episode);
                break;
            }
            let batch: Vec<ScenarioInstance> = self
                .instances
                .choose_multiple(&mut self.rng, batch_size)
                .cloned()
                .collect();
            let options = EpisodeOptions {
                episode,
                deterministic: !train_agent,
                train_agent_on_step: train_agent && training.train_on_step,
            };
            let records = self
                .run_batch(&batch, train_agent, options, Some(&mut buffer))
                .await?;
            buffer.finish_one_episode();

            if train_agent {
                if !training.train_on_step {
                    self.agent.train(&buffer)?;
                }
            } else {
                self.policy.train(&buffer)?;
            }
            trained = episode + 1;

            let mean_reward =
                records.iter().map(|r| r.episode_reward).sum::<f64>() / records.len().max(1) as f64;
            let collisions = records.iter().filter(|r| r.collided).count();
            tracing::info!(
                "Episode {}: mean reward {:.2}, {} of {} collided",
                episode,
                mean_reward,
                collisions,
                records.len()
            );

            if training.save_freq > 0 && trained % training.save_freq == 0 {
                self.save_model(train_agent, &model_dir, trained)?;
            }
            if training.eval_in_train_freq > 0 && trained % training.eval_in_train_freq == 0 {
                let records = self.evaluate(cancel).await?;
                let summary = PlanningSummary::from_records(&records, context.scenario.track);
                tracing::info!("Evaluation after episode {}: {:?}", trained, summary);
            }
        }

        self.save_model(train_agent, &model_dir, trained)
    }

    fn save_model(&self, train_agent: bool, model_dir: &Path, episode: u32) -> Result<()> {
        if train_agent {
            self.agent.save_model(model_dir, episode)
        } else {
            self.policy.save_model(model_dir, episode)
        }
    }

    /// Remove remaining actors, flush recorded trajectories and close the
    /// simulator.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(recorder) = self.recorder.take() {
            recorder.finish().await?;
        }
        self.env.close().await
    }
}
