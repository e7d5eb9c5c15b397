mod perception;
mod planning;
mod results;
mod tracks;

pub use perception::{BoundingBox, IOU_THRESHOLD, PerceptionRecord, PerceptionSummary};
pub use planning::{PlanningRecord, PlanningSummary};
pub use results::EvaluationResults;
pub use tracks::Track;
