use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// What a run does with the agent and the scenarios.
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Train the ego agent against the configured scenarios.
    #[value(name = "train_agent")]
    TrainAgent,
    /// Train the scenario policy against the configured agent.
    #[value(name = "train_scenario")]
    TrainScenario,
    /// Evaluate the agent on every scenario and score the result.
    #[value(name = "eval")]
    Eval,
}

/// Command-line arguments of the benchmark launcher. These take precedence
/// over anything in the agent and scenario config files.
#[derive(Parser, Debug, Clone)]
#[command(about = "Run agents against safety-critical driving scenarios")]
pub struct RunArgs {
    #[arg(long = "exp_name", default_value = "exp")]
    pub exp_name: String,
    #[arg(long = "output_dir", default_value = "log")]
    pub output_dir: PathBuf,
    /// Directory containing `configs/agent` and `configs/scenario`.
    #[arg(long = "root_dir", default_value = ".")]
    pub root_dir: PathBuf,

    #[arg(long = "max_episode_step", default_value_t = 300)]
    pub max_episode_step: u32,
    /// Drive the ego vehicle with the built-in lane keeping controller.
    #[arg(long = "auto_ego")]
    pub auto_ego: bool,
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = Mode::Eval)]
    pub mode: Mode,
    /// Agent config file name, relative to `configs/agent`.
    #[arg(long = "agent_cfg", default_value = "dummy.toml")]
    pub agent_cfg: String,
    /// Scenario config file name, relative to `configs/scenario`.
    #[arg(long = "scenario_cfg", default_value = "standard.toml")]
    pub scenario_cfg: String,
    #[arg(long = "continue_agent_training", visible_alias = "cat")]
    pub continue_agent_training: bool,
    #[arg(long = "continue_scenario_training", visible_alias = "cst")]
    pub continue_scenario_training: bool,

    #[arg(short = 's', long = "seed", default_value_t = 0)]
    pub seed: u64,
    /// Worker threads for the async runtime.
    #[arg(long = "threads", default_value_t = 4)]
    pub threads: usize,
    /// Device hint forwarded to learned agents.
    #[arg(long = "device", default_value = "cpu")]
    pub device: String,

    /// Number of scenarios run in parallel in one episode.
    #[arg(long = "num_scenario", visible_alias = "ns", default_value_t = 2)]
    pub num_scenario: usize,
    #[arg(long = "save_video")]
    pub save_video: bool,
    #[arg(long = "render", action = ArgAction::Set, default_value_t = true)]
    pub render: bool,
    /// Simulator ticks per environment step.
    #[arg(long = "frame_skip", visible_alias = "fs", default_value_t = 1)]
    pub frame_skip: u32,
    /// Host running the simulator bridge.
    #[arg(long = "host", default_value = "localhost")]
    pub host: String,
    /// Port to communicate with the simulator.
    #[arg(long = "port", default_value_t = 2000)]
    pub port: u16,
    /// Traffic manager port.
    #[arg(long = "tm_port", default_value_t = 8000)]
    pub tm_port: u16,
    #[arg(long = "fixed_delta_seconds", default_value_t = 0.1)]
    pub fixed_delta_seconds: f64,
}

impl RunArgs {
    pub fn agent_config_path(&self) -> PathBuf {
        self.root_dir.join("configs/agent").join(&self.agent_cfg)
    }

    pub fn scenario_config_path(&self) -> PathBuf {
        self.root_dir.join("configs/scenario").join(&self.scenario_cfg)
    }

    /// Directory for results, checkpoints and recorded trajectories of this run.
    pub fn experiment_dir(&self) -> PathBuf {
        self.output_dir.join(&self.exp_name)
    }
}
