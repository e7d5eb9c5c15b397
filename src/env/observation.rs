use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::sim::{ActorState, RoadMap, Route, VehicleControl, normalize_angle};

/// Reported gap when no vehicle is ahead, in metres.
pub const MAX_FRONT_GAP: f64 = 100.0;

/// What the ego agent perceives at each step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Forward speed in m/s.
    pub speed: f64,
    /// Signed distance from the route centerline, positive to the left.
    pub lateral_offset: f64,
    /// Ego yaw minus lane yaw in radians, positive to the left.
    pub heading_error: f64,
    /// Bumper-to-bumper distance to the nearest vehicle ahead in the route lane.
    pub front_gap: f64,
    /// Speed of the vehicle ahead minus ego speed.
    pub front_relative_speed: f64,
    /// Fraction of the route driven.
    pub route_completion: f64,
}

impl Observation {
    pub const DIM: usize = 6;

    pub fn compute<'a>(
        map: &RoadMap,
        route: &Route,
        ego: &ActorState,
        others: impl Iterator<Item = &'a ActorState>,
    ) -> Result<Self> {
        let lane = map.lane(route.lane_id)?;
        let projection = lane.project(&ego.transform.location);
        let lane_yaw = lane.transform_at(projection.s).rotation.yaw_radians();
        let heading_error = normalize_angle(ego.transform.rotation.yaw_radians() - lane_yaw);

        let mut front_gap = MAX_FRONT_GAP;
        let mut front_relative_speed = 0.0;
        for other in others {
            let other_projection = lane.project(&other.transform.location);
            if other_projection.distance > lane.width / 2.0 {
                continue;
            }
            let gap = other_projection.s - projection.s - ego.half_length - other.half_length;
            if other_projection.s > projection.s && gap < front_gap {
                front_gap = gap.max(0.0);
                front_relative_speed = other.speed - ego.speed;
            }
        }

        Ok(Self {
            speed: ego.speed,
            lateral_offset: projection.lateral,
            heading_error,
            front_gap,
            front_relative_speed,
            route_completion: route.completion(projection.s),
        })
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.speed as f32,
            self.lateral_offset as f32,
            self.heading_error as f32,
            self.front_gap as f32,
            self.front_relative_speed as f32,
            self.route_completion as f32,
        ]
    }
}

/// High-level ego command. Both components are in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EgoAction {
    /// Positive accelerates, negative brakes.
    pub acceleration: f32,
    /// Positive steers right.
    pub steering: f32,
}

impl EgoAction {
    pub const DIM: usize = 2;

    pub fn new(acceleration: f32, steering: f32) -> Self {
        Self {
            acceleration: acceleration.clamp(-1.0, 1.0),
            steering: steering.clamp(-1.0, 1.0),
        }
    }

    pub fn to_control(&self) -> VehicleControl {
        VehicleControl {
            throttle: self.acceleration.max(0.0),
            steer: self.steering,
            brake: (-self.acceleration).max(0.0),
        }
        .clamped()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![self.acceleration, self.steering]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Location, Rotation, Transform};

    fn actor(id: u32, x: f64, y: f64, yaw: f64, speed: f64) -> ActorState {
        ActorState {
            id,
            transform: Transform::new(Location::new(x, y, 0.0), Rotation::from_yaw(yaw)),
            speed,
            half_length: 2.0,
            half_width: 1.0,
        }
    }

    #[test]
    fn test_compute_observation() {
        let map = RoadMap::straight_road(2, 200.0, 4.0).unwrap();
        let route = Route {
            lane_id: 0,
            start_s: 0.0,
            end_s: 100.0,
        };
        let ego = actor(1, 50.0, 0.5, 10.0, 5.0);
        let ahead = actor(2, 70.0, -0.3, 0.0, 8.0);
        let far_ahead = actor(3, 90.0, 0.0, 0.0, 1.0);
        let other_lane = actor(4, 55.0, 4.0, 0.0, 0.0);
        let behind = actor(5, 40.0, 0.0, 0.0, 9.0);

        let obs = Observation::compute(
            &map,
            &route,
            &ego,
            [ahead, far_ahead, other_lane, behind].iter(),
        )
        .unwrap();
        assert_eq!(obs.speed, 5.0);
        assert!((obs.lateral_offset - 0.5).abs() < 1e-9);
        assert!((obs.heading_error - 10f64.to_radians()).abs() < 1e-9);
        assert!((obs.front_gap - 16.0).abs() < 1e-9);
        assert!((obs.front_relative_speed - 3.0).abs() < 1e-9);
        assert!((obs.route_completion - 0.5).abs() < 1e-9);
        assert_eq!(obs.to_vec().len(), Observation::DIM);
    }

    #[test]
    fn test_no_vehicle_ahead() {
        let map = RoadMap::straight_road(1, 200.0, 4.0).unwrap();
        let route = Route {
            lane_id: 0,
            start_s: 0.0,
            end_s: 200.0,
        };
        let ego = actor(1, 10.0, 0.0, 0.0, 0.0);
        let obs = Observation::compute(&map, &route, &ego, std::iter::empty()).unwrap();
        assert_eq!(obs.front_gap, MAX_FRONT_GAP);
        assert_eq!(obs.front_relative_speed, 0.0);
    }

    #[test]
    fn test_action_to_control() {
        let control = EgoAction::new(0.5, -2.0).to_control();
        assert_eq!(control.throttle, 0.5);
        assert_eq!(control.brake, 0.0);
        assert_eq!(control.steer, -1.0);

        let control = EgoAction::new(-0.25, 0.1).to_control();
        assert_eq!(control.throttle, 0.0);
        assert_eq!(control.brake, 0.25);
    }
}
