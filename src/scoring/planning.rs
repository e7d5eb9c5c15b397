use serde::{Deserialize, Serialize};

use crate::scoring::Track;

/// Outcome of one ego vehicle driving through one scenario.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlanningRecord {
    pub scenario_id: usize,
    pub route_id: usize,
    pub collided: bool,
    /// Metres driven outside the drivable area.
    pub out_of_road_length: f64,
    /// Mean lateral distance to the route centerline, in metres.
    pub distance_to_route: f64,
    /// Fraction of the route driven, in [0, 1].
    pub route_completion: f64,
    /// Simulated seconds until the episode ended.
    pub running_time: f64,
    pub episode_reward: f64,
}

/// Planning metrics averaged over all evaluated scenarios.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PlanningSummary {
    pub num_scenarios: usize,
    pub collision_rate: f64,
    pub out_of_road_length: f64,
    pub distance_to_route: f64,
    pub incomplete_route: f64,
    pub running_time: f64,
    /// Combined score of the track, in [0, 1].
    pub final_score: f64,
}

// Weights and scales of the final score. Each metric is mapped to [0, 1]
// where 1 is the best driving outcome.
const COLLISION_WEIGHT: f64 = 0.4;
const OUT_OF_ROAD_WEIGHT: f64 = 0.15;
const DISTANCE_TO_ROUTE_WEIGHT: f64 = 0.15;
const COMPLETION_WEIGHT: f64 = 0.2;
const RUNNING_TIME_WEIGHT: f64 = 0.1;
const OUT_OF_ROAD_SCALE: f64 = 10.0;
const DISTANCE_TO_ROUTE_SCALE: f64 = 1.0;
const RUNNING_TIME_SCALE: f64 = 60.0;

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

impl PlanningSummary {
    pub fn from_records(records: &[PlanningRecord], track: Track) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let collision_rate = mean(records.iter().map(|r| if r.collided { 1.0 } else { 0.0 }));
        let out_of_road_length = mean(records.iter().map(|r| r.out_of_road_length));
        let distance_to_route = mean(records.iter().map(|r| r.distance_to_route));
        let incomplete_route = 1.0 - mean(records.iter().map(|r| r.route_completion));
        let running_time = mean(records.iter().map(|r| r.running_time));

        let driving_score = COLLISION_WEIGHT * (1.0 - collision_rate)
            + OUT_OF_ROAD_WEIGHT / (1.0 + out_of_road_length / OUT_OF_ROAD_SCALE)
            + DISTANCE_TO_ROUTE_WEIGHT / (1.0 + distance_to_route / DISTANCE_TO_ROUTE_SCALE)
            + COMPLETION_WEIGHT * (1.0 - incomplete_route)
            + RUNNING_TIME_WEIGHT / (1.0 + running_time / RUNNING_TIME_SCALE);

        Self {
            num_scenarios: records.len(),
            collision_rate,
            out_of_road_length,
            distance_to_route,
            incomplete_route,
            running_time,
            final_score: track.orient(driving_score),
        }
    }
}
