mod agents;
mod observability;
mod parents;
mod recorder;
mod run;
mod scenario;

pub use agents::{
    AgentConfig, AgentPolicyConfig, DummyConfig, LaneKeepingConfig, RandomConfig, TrainingConfig,
};
pub use observability::{LoggingConfig, MetricsConfig, ObservabilityConfig};
pub use parents::{LoadableConfig, RunContext};
pub use recorder::TrajectoryRecorderConfig;
pub use run::{Mode, RunArgs};
pub use scenario::{
    EgoConfig, MapConfig, ScenarioCategory, ScenarioConfig, ScenarioKind, ScenarioPolicyConfig,
    ScenarioSpec, SimulatorConfig, TriggerPoint,
};
