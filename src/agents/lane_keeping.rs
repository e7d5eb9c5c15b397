use crate::agents::Agent;
use crate::config::LaneKeepingConfig;
use crate::env::{EgoAction, Observation};
use crate::sim::{MAX_STEER_ANGLE, WHEELBASE};

/// Standstill distance kept to the vehicle ahead, in metres.
const MIN_GAP: f64 = 5.0;

/// Rule-based driver: pure pursuit along the route lane and a proportional
/// speed controller that keeps a time gap to the vehicle ahead. Drives the ego
/// vehicle when `--auto_ego` is set.
pub struct LaneKeepingAgent {
    name: String,
    config: LaneKeepingConfig,
}

impl LaneKeepingAgent {
    pub fn new(name: &str, config: &LaneKeepingConfig) -> Self {
        Self {
            name: name.to_string(),
            config: config.clone(),
        }
    }

    fn desired_speed(&self, obs: &Observation) -> f64 {
        let gap_limited = ((obs.front_gap - MIN_GAP) / self.config.time_gap).max(0.0);
        self.config.target_speed.min(gap_limited)
    }

    fn steering(&self, obs: &Observation) -> f64 {
        let lookahead = self.config.lookahead;
        // Angle to the lookahead point on the centerline, in the vehicle frame.
        let alpha = (-obs.lateral_offset).atan2(lookahead) - obs.heading_error;
        let wheel_angle = (2.0 * WHEELBASE * alpha.sin() / lookahead).atan();
        // Positive steering turns right, i.e. towards negative angles.
        -wheel_angle / MAX_STEER_ANGLE
    }
}

impl Agent for LaneKeepingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_action(&mut self, obs: &Observation, _deterministic: bool) -> EgoAction {
        let acceleration = self.config.speed_gain * (self.desired_speed(obs) - obs.speed);
        EgoAction::new(acceleration as f32, self.steering(obs) as f32)
    }
}
