use std::path::PathBuf;

use serde::Deserialize;

use crate::config::{ObservabilityConfig, TrainingConfig, TrajectoryRecorderConfig};
use crate::scoring::Track;
use crate::sim::LaneId;

/// A scenario config selects the traffic scenarios to run and how they are
/// generated.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub type_category: ScenarioCategory,
    /// Track the results are scored under.
    #[serde(default = "default_track")]
    pub track: Track,
    #[serde(default)]
    pub policy: ScenarioPolicyConfig,
    /// Scenario instances. Ignored for the scenic category, whose scenes come
    /// from `scenic_scene_dir`.
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
    /// Directory of scenes pre-sampled from Scenic programs, one JSON file each.
    #[serde(default)]
    pub scenic_scene_dir: Option<PathBuf>,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub ego: EgoConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub trajectory_recorder: TrajectoryRecorderConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_track() -> Track {
    Track::PlanningDefense
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCategory {
    /// Benign scenarios with scripted traffic.
    Standard,
    /// Scenarios whose actor trajectories are perturbed by a scenario policy.
    AdvTrajectory,
    /// Scenes sampled from Scenic programs.
    Scenic,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    LeadingVehicle,
    OtherLeadingVehicle,
}

/// Where a scenario is triggered: the ego vehicle starts here.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TriggerPoint {
    pub lane_id: LaneId,
    /// Arc length along the lane, in metres.
    pub s: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioSpec {
    pub scenario_id: usize,
    #[serde(default)]
    pub route_id: usize,
    pub kind: ScenarioKind,
    pub trigger_point: TriggerPoint,
    /// JSON file holding the perturbation parameters, each in [0, 1].
    #[serde(default)]
    pub parameters_file: Option<PathBuf>,
    /// Inline perturbation parameters, used when no file is given.
    #[serde(default)]
    pub parameters: Vec<f64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioPolicyConfig {
    /// Use the parameters stored with each scenario.
    #[default]
    Fixed,
    /// Sample parameters uniformly in [0, 1].
    Random { num_parameters: usize },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapConfig {
    StraightRoad {
        num_lanes: usize,
        length: f64,
        lane_width: f64,
    },
    /// A JSON lane graph exported from the simulator.
    File { path: PathBuf },
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig::StraightRoad {
            num_lanes: 3,
            length: 600.0,
            lane_width: 3.5,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulatorConfig {
    /// Built-in kinematic simulator, for offline runs.
    #[default]
    Kinematic,
    /// External CARLA server reached through the bridge at `--host:--port`.
    Bridge {
        #[serde(default)]
        town: Option<String>,
    },
}

fn default_ego_blueprint() -> String {
    "vehicle.lincoln.mkz_2017".to_string()
}

fn default_route_length() -> f64 {
    150.0
}

#[derive(Deserialize, Debug, Clone)]
pub struct EgoConfig {
    #[serde(default = "default_ego_blueprint")]
    pub blueprint: String,
    /// Length of the route starting at the trigger point, in metres.
    #[serde(default = "default_route_length")]
    pub route_length: f64,
}

impl Default for EgoConfig {
    fn default() -> Self {
        Self {
            blueprint: default_ego_blueprint(),
            route_length: default_route_length(),
        }
    }
}
