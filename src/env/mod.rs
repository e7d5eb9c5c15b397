mod observation;
mod scenario_env;
mod vector;

pub use observation::{EgoAction, MAX_FRONT_GAP, Observation};
pub use scenario_env::{ScenarioEnv, StepInfo, StepOutcome};
pub use vector::VectorEnv;
