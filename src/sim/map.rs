use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::sim::geometry::{Location, Rotation, Transform};

pub type LaneId = usize;

/// A lane described by its centerline polyline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    pub centerline: Vec<Location>,
    pub width: f64,
    #[serde(default)]
    pub left: Option<LaneId>,
    #[serde(default)]
    pub right: Option<LaneId>,
    /// Cumulative arc length at each centerline point. Filled in by RoadMap::new.
    #[serde(skip)]
    cumulative: Vec<f64>,
}

impl Lane {
    pub fn new(
        id: LaneId,
        centerline: Vec<Location>,
        width: f64,
        left: Option<LaneId>,
        right: Option<LaneId>,
    ) -> Self {
        Self {
            id,
            centerline,
            width,
            left,
            right,
            cumulative: Vec::new(),
        }
    }

    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn compute_cumulative(&mut self) {
        self.cumulative = Vec::with_capacity(self.centerline.len());
        let mut total = 0.0;
        for (i, point) in self.centerline.iter().enumerate() {
            if i > 0 {
                total += self.centerline[i - 1].distance_2d(point);
            }
            self.cumulative.push(total);
        }
    }

    /// Transform at arc length `s`, clamped to the lane's extent.
    pub fn transform_at(&self, s: f64) -> Transform {
        let s = s.clamp(0.0, self.length());
        let segment = self
            .cumulative
            .windows(2)
            .position(|w| s <= w[1])
            .unwrap_or(self.centerline.len().saturating_sub(2));
        let start = self.centerline[segment];
        let end = self.centerline[segment + 1];
        let seg_len = self.cumulative[segment + 1] - self.cumulative[segment];
        let t = if seg_len > 0.0 {
            (s - self.cumulative[segment]) / seg_len
        } else {
            0.0
        };
        let location = start + (end - start) * t;
        let yaw = (end.y - start.y).atan2(end.x - start.x).to_degrees();
        Transform::new(location, Rotation::from_yaw(yaw))
    }

    /// Project a location onto the centerline.
    pub fn project(&self, location: &Location) -> Projection {
        let mut best = Projection {
            lane_id: self.id,
            s: 0.0,
            lateral: f64::INFINITY,
            distance: f64::INFINITY,
        };
        for (i, w) in self.centerline.windows(2).enumerate() {
            let (start, end) = (w[0], w[1]);
            let dx = end.x - start.x;
            let dy = end.y - start.y;
            let seg_len_sq = dx * dx + dy * dy;
            if seg_len_sq == 0.0 {
                continue;
            }
            let t = (((location.x - start.x) * dx + (location.y - start.y) * dy) / seg_len_sq)
                .clamp(0.0, 1.0);
            let px = start.x + t * dx;
            let py = start.y + t * dy;
            let distance = ((location.x - px).powi(2) + (location.y - py).powi(2)).sqrt();
            if distance < best.distance {
                // Positive when the location is to the left of the direction of travel.
                let cross = dx * (location.y - start.y) - dy * (location.x - start.x);
                best = Projection {
                    lane_id: self.id,
                    s: self.cumulative[i] + t * seg_len_sq.sqrt(),
                    lateral: distance.copysign(cross),
                    distance,
                };
            }
        }
        best
    }
}

/// Result of projecting a location onto a lane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub lane_id: LaneId,
    /// Arc length along the lane.
    pub s: f64,
    /// Signed lateral offset from the centerline, positive to the left.
    pub lateral: f64,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub lane_id: LaneId,
    pub s: f64,
    pub transform: Transform,
}

/// The lane graph of the loaded town.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RoadMapData")]
pub struct RoadMap {
    pub name: String,
    lanes: Vec<Lane>,
}

#[derive(Deserialize)]
struct RoadMapData {
    name: String,
    lanes: Vec<Lane>,
}

impl TryFrom<RoadMapData> for RoadMap {
    type Error = anyhow::Error;

    fn try_from(data: RoadMapData) -> Result<Self> {
        RoadMap::new(data.name, data.lanes)
    }
}

impl RoadMap {
    pub fn new(name: impl Into<String>, mut lanes: Vec<Lane>) -> Result<Self> {
        for (index, lane) in lanes.iter_mut().enumerate() {
            if lane.id != index {
                bail!("Lane ids must match their position, found {} at {}", lane.id, index);
            }
            if lane.centerline.len() < 2 {
                bail!("Lane {} needs at least two centerline points", lane.id);
            }
            lane.compute_cumulative();
        }
        let num_lanes = lanes.len();
        for lane in &lanes {
            for neighbour in [lane.left, lane.right].into_iter().flatten() {
                if neighbour >= num_lanes {
                    bail!("Lane {} references unknown lane {}", lane.id, neighbour);
                }
            }
        }
        Ok(Self {
            name: name.into(),
            lanes,
        })
    }

    /// A straight multi-lane road along +x. Lane 0 is the rightmost lane and
    /// lane `k + 1` is to the left of lane `k`.
    pub fn straight_road(num_lanes: usize, length: f64, lane_width: f64) -> Result<Self> {
        let lanes = (0..num_lanes)
            .map(|k| {
                let y = k as f64 * lane_width;
                Lane::new(
                    k,
                    vec![Location::new(0.0, y, 0.0), Location::new(length, y, 0.0)],
                    lane_width,
                    (k + 1 < num_lanes).then_some(k + 1),
                    k.checked_sub(1),
                )
            })
            .collect();
        Self::new(format!("straight_{num_lanes}x{length}"), lanes)
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, lane_id: LaneId) -> Result<&Lane> {
        self.lanes
            .get(lane_id)
            .with_context(|| format!("Unknown lane {lane_id} in map {}", self.name))
    }

    pub fn waypoint_at(&self, lane_id: LaneId, s: f64) -> Result<Waypoint> {
        let lane = self.lane(lane_id)?;
        let s = s.clamp(0.0, lane.length());
        Ok(Waypoint {
            lane_id,
            s,
            transform: lane.transform_at(s),
        })
    }

    pub fn nearest_projection(&self, location: &Location) -> Option<Projection> {
        self.lanes
            .iter()
            .map(|lane| lane.project(location))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// The waypoint on the lane centerline closest to the location.
    pub fn waypoint(&self, location: &Location) -> Option<Waypoint> {
        let projection = self.nearest_projection(location)?;
        self.waypoint_at(projection.lane_id, projection.s).ok()
    }

    /// Move a waypoint `distance` metres further along its lane. Returns the new
    /// waypoint and the distance actually travelled, which is shorter than
    /// requested when the lane ends.
    pub fn advance(&self, waypoint: &Waypoint, distance: f64) -> Result<(Waypoint, f64)> {
        let lane = self.lane(waypoint.lane_id)?;
        let target = (waypoint.s + distance).min(lane.length());
        let travelled = target - waypoint.s;
        Ok((self.waypoint_at(waypoint.lane_id, target)?, travelled))
    }

    pub fn left_lane(&self, waypoint: &Waypoint) -> Option<Waypoint> {
        let left = self.lanes.get(waypoint.lane_id)?.left?;
        self.waypoint_at(left, waypoint.s).ok()
    }

    pub fn right_lane(&self, waypoint: &Waypoint) -> Option<Waypoint> {
        let right = self.lanes.get(waypoint.lane_id)?.right?;
        self.waypoint_at(right, waypoint.s).ok()
    }

    /// Distance from the location to the nearest drivable area, zero on the road.
    pub fn distance_to_road(&self, location: &Location) -> f64 {
        self.lanes
            .iter()
            .map(|lane| (lane.project(location).distance - lane.width / 2.0).max(0.0))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn is_on_road(&self, location: &Location) -> bool {
        self.distance_to_road(location) <= 0.0
    }
}

/// A route the ego vehicle is expected to drive: a stretch of one lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub lane_id: LaneId,
    pub start_s: f64,
    pub end_s: f64,
}

impl Route {
    pub fn length(&self) -> f64 {
        (self.end_s - self.start_s).max(0.0)
    }

    /// Fraction of the route covered at arc length `s`, in [0, 1].
    pub fn completion(&self, s: f64) -> f64 {
        if self.length() <= 0.0 {
            return 1.0;
        }
        ((s - self.start_s) / self.length()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_straight_road_neighbours() {
        let map = RoadMap::straight_road(3, 200.0, 3.5).unwrap();
        assert_eq!(map.lanes().len(), 3);
        assert_eq!(map.lane(0).unwrap().right, None);
        assert_eq!(map.lane(0).unwrap().left, Some(1));
        assert_eq!(map.lane(2).unwrap().left, None);
        assert!((map.lane(1).unwrap().length() - 200.0).abs() < EPS);
    }

    #[test]
    fn test_waypoint_projection() {
        let map = RoadMap::straight_road(2, 100.0, 4.0).unwrap();
        let waypoint = map.waypoint(&Location::new(30.0, 3.0, 0.0)).unwrap();
        assert_eq!(waypoint.lane_id, 1);
        assert!((waypoint.s - 30.0).abs() < EPS);
        assert!((waypoint.transform.location.y - 4.0).abs() < EPS);

        let projection = map.lane(0).unwrap().project(&Location::new(10.0, -1.0, 0.0));
        assert!((projection.lateral + 1.0).abs() < EPS);
    }

    #[test]
    fn test_advance_and_left_lane() {
        let map = RoadMap::straight_road(2, 100.0, 4.0).unwrap();
        let start = map.waypoint_at(0, 10.0).unwrap();
        let (ahead, travelled) = map.advance(&start, 35.0).unwrap();
        assert!((ahead.s - 45.0).abs() < EPS);
        assert!((travelled - 35.0).abs() < EPS);

        let (end, travelled) = map.advance(&ahead, 500.0).unwrap();
        assert!((end.s - 100.0).abs() < EPS);
        assert!((travelled - 55.0).abs() < EPS);

        let left = map.left_lane(&ahead).unwrap();
        assert_eq!(left.lane_id, 1);
        assert!((left.transform.location.x - 45.0).abs() < EPS);
        assert!(map.left_lane(&left).is_none());
    }

    #[test]
    fn test_distance_to_road() {
        let map = RoadMap::straight_road(1, 100.0, 4.0).unwrap();
        assert!(map.is_on_road(&Location::new(50.0, 1.5, 0.0)));
        assert!((map.distance_to_road(&Location::new(50.0, 5.0, 0.0)) - 3.0).abs() < EPS);
    }

    #[test]
    fn test_invalid_lane_reference_is_rejected() {
        let lane = Lane::new(
            0,
            vec![Location::new(0.0, 0.0, 0.0), Location::new(1.0, 0.0, 0.0)],
            3.0,
            Some(4),
            None,
        );
        assert!(RoadMap::new("broken", vec![lane]).is_err());
    }

    #[test]
    fn test_map_deserializes_with_lengths() {
        let json = r#"{"name":"bend","lanes":[{"id":0,"width":3.5,
            "centerline":[{"x":0.0,"y":0.0},{"x":30.0,"y":0.0},{"x":30.0,"y":40.0}]}]}"#;
        let map: RoadMap = serde_json::from_str(json).unwrap();
        assert!((map.lane(0).unwrap().length() - 70.0).abs() < EPS);
        let transform = map.lane(0).unwrap().transform_at(50.0);
        assert!((transform.location.y - 20.0).abs() < EPS);
        assert!((transform.rotation.yaw - 90.0).abs() < EPS);
    }

    #[test]
    fn test_route_completion() {
        let route = Route {
            lane_id: 0,
            start_s: 10.0,
            end_s: 110.0,
        };
        assert!((route.completion(60.0) - 0.5).abs() < EPS);
        assert_eq!(route.completion(0.0), 0.0);
        assert_eq!(route.completion(500.0), 1.0);
    }
}
