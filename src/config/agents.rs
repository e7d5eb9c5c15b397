use std::path::PathBuf;

use serde::Deserialize;

fn default_agent_name() -> String {
    "unnamed".to_string()
}

/// An agent config selects the ego policy under evaluation and how it is trained.
#[derive(Deserialize, Debug, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    pub policy: AgentPolicyConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentPolicyConfig {
    Dummy(DummyConfig),
    Random(RandomConfig),
    LaneKeeping(LaneKeepingConfig),
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DummyConfig {
    /// Constant acceleration command in [-1, 1].
    #[serde(default)]
    pub acceleration: f32,
    /// Constant steering command in [-1, 1].
    #[serde(default)]
    pub steering: f32,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RandomConfig {
    /// Only sample non-negative accelerations.
    #[serde(default)]
    pub forward_only: bool,
}

fn default_target_speed() -> f64 {
    8.0
}

fn default_lookahead() -> f64 {
    6.0
}

fn default_speed_gain() -> f64 {
    0.5
}

#[derive(Deserialize, Debug, Clone)]
pub struct LaneKeepingConfig {
    /// Cruise speed in m/s.
    #[serde(default = "default_target_speed")]
    pub target_speed: f64,
    /// Pure pursuit lookahead distance in metres.
    #[serde(default = "default_lookahead")]
    pub lookahead: f64,
    #[serde(default = "default_speed_gain")]
    pub speed_gain: f64,
    /// Keep at least this time gap to the vehicle ahead, in seconds.
    #[serde(default = "default_time_gap")]
    pub time_gap: f64,
}

fn default_time_gap() -> f64 {
    1.5
}

impl Default for LaneKeepingConfig {
    fn default() -> Self {
        Self {
            target_speed: default_target_speed(),
            lookahead: default_lookahead(),
            speed_gain: default_speed_gain(),
            time_gap: default_time_gap(),
        }
    }
}

/// Training schedule shared by agents and scenario policies.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training episodes.
    pub train_episode: u32,
    /// Run an evaluation pass every this many episodes. Zero disables it.
    pub eval_in_train_freq: u32,
    /// Save a checkpoint every this many episodes. Zero disables it.
    pub save_freq: u32,
    pub buffer_capacity: usize,
    pub batch_size: usize,
    /// Train after every step instead of after every episode.
    pub train_on_step: bool,
    /// Directory for checkpoints, relative to the experiment directory.
    pub model_path: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_episode: 100,
            eval_in_train_freq: 10,
            save_freq: 20,
            buffer_capacity: 10_000,
            batch_size: 64,
            train_on_step: false,
            model_path: PathBuf::from("model"),
        }
    }
}
