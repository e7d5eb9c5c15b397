use ahash::AHashMap as HashMap;
use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::sim::geometry::{Location, Rotation, Transform, normalize_angle};
use crate::sim::map::RoadMap;
use crate::sim::world::{
    ActorId, ActorState, CollisionEvent, MAX_STEER_ANGLE, Simulator, Snapshot, VehicleControl,
    WHEELBASE,
};

const MAX_ACCELERATION: f64 = 3.5;
const MAX_DECELERATION: f64 = 8.0;

struct Vehicle {
    state: ActorState,
    control: VehicleControl,
    target_speed: Option<f64>,
}

/// An in-process stand-in for CARLA. Vehicles follow a kinematic bicycle model
/// and collisions are detected with oriented bounding boxes.
pub struct KinematicSimulator {
    map: RoadMap,
    fixed_delta_seconds: f64,
    next_actor_id: ActorId,
    vehicles: HashMap<ActorId, Vehicle>,
    snapshot: Snapshot,
}

impl KinematicSimulator {
    pub fn new(map: RoadMap, fixed_delta_seconds: f64) -> Self {
        Self {
            map,
            fixed_delta_seconds,
            next_actor_id: 1,
            vehicles: HashMap::new(),
            snapshot: Snapshot::default(),
        }
    }

    fn refresh_snapshot(&mut self) {
        self.snapshot.actors = self
            .vehicles
            .iter()
            .map(|(&id, vehicle)| (id, vehicle.state))
            .collect();
    }

    fn step_vehicle(vehicle: &mut Vehicle, dt: f64) {
        let control = vehicle.control;
        let state = &mut vehicle.state;

        state.speed = match vehicle.target_speed {
            Some(speed) => speed,
            None => {
                let acceleration = control.throttle as f64 * MAX_ACCELERATION
                    - control.brake as f64 * MAX_DECELERATION;
                (state.speed + acceleration * dt).max(0.0)
            }
        };

        // Positive steer turns right, which is a negative yaw rate.
        let steer_angle = control.steer as f64 * MAX_STEER_ANGLE;
        let yaw_rate = -state.speed / WHEELBASE * steer_angle.tan();
        let yaw = normalize_angle(state.transform.rotation.yaw_radians() + yaw_rate * dt);
        state.transform.rotation = Rotation::from_yaw(yaw.to_degrees());
        let forward = state.transform.rotation.forward_vector();
        state.transform.location += forward * (state.speed * dt);
    }
}

/// Vehicle footprint used for collision checks, by blueprint family.
fn blueprint_extent(blueprint: &str) -> (f64, f64) {
    if blueprint.starts_with("walker") {
        (0.3, 0.3)
    } else if blueprint.contains("bike") || blueprint.contains("harley") {
        (1.1, 0.4)
    } else {
        (2.3, 1.0)
    }
}

fn corners(state: &ActorState) -> [Location; 4] {
    let center = state.transform.location;
    let forward = state.transform.rotation.forward_vector() * state.half_length;
    let right = state.transform.rotation.right_vector() * state.half_width;
    [
        center + forward + right,
        center + forward - right,
        center - forward - right,
        center - forward + right,
    ]
}

/// Separating axis test between two oriented rectangles in the ground plane.
pub(crate) fn boxes_overlap(a: &ActorState, b: &ActorState) -> bool {
    let corners_a = corners(a);
    let corners_b = corners(b);
    let axes = [
        a.transform.rotation.forward_vector(),
        a.transform.rotation.right_vector(),
        b.transform.rotation.forward_vector(),
        b.transform.rotation.right_vector(),
    ];
    axes.iter().all(|axis| {
        let project = |corners: &[Location; 4]| {
            corners.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                let p = c.x * axis.x + c.y * axis.y;
                (lo.min(p), hi.max(p))
            })
        };
        let (min_a, max_a) = project(&corners_a);
        let (min_b, max_b) = project(&corners_b);
        max_a >= min_b && max_b >= min_a
    })
}

#[async_trait]
impl Simulator for KinematicSimulator {
    fn map(&self) -> &RoadMap {
        &self.map
    }

    async fn spawn_actor(&mut self, blueprint: &str, transform: Transform) -> Result<ActorId> {
        let (half_length, half_width) = blueprint_extent(blueprint);
        let id = self.next_actor_id;
        let state = ActorState {
            id,
            transform,
            speed: 0.0,
            half_length,
            half_width,
        };
        if let Some(blocking) = self
            .vehicles
            .values()
            .find(|vehicle| boxes_overlap(&vehicle.state, &state))
        {
            bail!(
                "Cannot spawn {} at {:?}: overlaps actor {}",
                blueprint,
                transform.location,
                blocking.state.id
            );
        }
        self.next_actor_id += 1;
        self.vehicles.insert(
            id,
            Vehicle {
                state,
                control: VehicleControl::default(),
                target_speed: None,
            },
        );
        self.refresh_snapshot();
        tracing::debug!("Spawned {} as actor {}", blueprint, id);
        Ok(id)
    }

    async fn destroy_actor(&mut self, id: ActorId) -> Result<()> {
        if self.vehicles.remove(&id).is_none() {
            bail!("Cannot destroy unknown actor {}", id);
        }
        self.refresh_snapshot();
        Ok(())
    }

    async fn apply_control(&mut self, id: ActorId, control: VehicleControl) -> Result<()> {
        let Some(vehicle) = self.vehicles.get_mut(&id) else {
            bail!("Cannot control unknown actor {}", id);
        };
        vehicle.control = control.clamped();
        vehicle.target_speed = None;
        Ok(())
    }

    async fn set_target_speed(&mut self, id: ActorId, speed: f64) -> Result<()> {
        let Some(vehicle) = self.vehicles.get_mut(&id) else {
            bail!("Cannot set speed of unknown actor {}", id);
        };
        vehicle.control = VehicleControl::default();
        vehicle.target_speed = Some(speed.max(0.0));
        Ok(())
    }

    async fn tick(&mut self) -> Result<Snapshot> {
        let dt = self.fixed_delta_seconds;
        for vehicle in self.vehicles.values_mut() {
            Self::step_vehicle(vehicle, dt);
        }

        let mut ids: Vec<ActorId> = self.vehicles.keys().copied().collect();
        ids.sort_unstable();
        let mut collisions = Vec::new();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                if boxes_overlap(&self.vehicles[&a].state, &self.vehicles[&b].state) {
                    collisions.push(CollisionEvent { actor: a, other: b });
                }
            }
        }

        self.snapshot.frame += 1;
        self.snapshot.elapsed_seconds += dt;
        self.snapshot.collisions = collisions;
        self.refresh_snapshot();
        Ok(self.snapshot.clone())
    }

    fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    async fn close(&mut self) -> Result<()> {
        self.vehicles.clear();
        self.refresh_snapshot();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> KinematicSimulator {
        KinematicSimulator::new(RoadMap::straight_road(2, 500.0, 3.5).unwrap(), 0.1)
    }

    fn at(x: f64, y: f64) -> Transform {
        Transform::new(Location::new(x, y, 0.0), Rotation::from_yaw(0.0))
    }

    #[tokio::test]
    async fn test_target_speed_moves_forward() {
        let mut sim = simulator();
        let id = sim.spawn_actor("vehicle.audi.tt", at(0.0, 0.0)).await.unwrap();
        sim.set_target_speed(id, 10.0).await.unwrap();
        for _ in 0..10 {
            sim.tick().await.unwrap();
        }
        let state = sim.snapshot().actor(id).unwrap();
        assert!((state.transform.location.x - 10.0).abs() < 1e-6);
        assert!(state.transform.location.y.abs() < 1e-6);
        assert_eq!(sim.snapshot().frame, 10);
    }

    #[tokio::test]
    async fn test_throttle_and_brake() {
        let mut sim = simulator();
        let id = sim.spawn_actor("vehicle.audi.tt", at(0.0, 0.0)).await.unwrap();
        let throttle = VehicleControl {
            throttle: 1.0,
            ..Default::default()
        };
        sim.apply_control(id, throttle).await.unwrap();
        sim.tick().await.unwrap();
        let speed = sim.snapshot().actor(id).unwrap().speed;
        assert!((speed - MAX_ACCELERATION * 0.1).abs() < 1e-9);

        let brake = VehicleControl {
            brake: 1.0,
            ..Default::default()
        };
        sim.apply_control(id, brake).await.unwrap();
        sim.tick().await.unwrap();
        assert_eq!(sim.snapshot().actor(id).unwrap().speed, 0.0);
    }

    #[tokio::test]
    async fn test_steering_right_decreases_yaw() {
        let mut sim = simulator();
        let id = sim.spawn_actor("vehicle.audi.tt", at(0.0, 0.0)).await.unwrap();
        sim.apply_control(
            id,
            VehicleControl {
                throttle: 1.0,
                steer: 0.5,
                brake: 0.0,
            },
        )
        .await
        .unwrap();
        for _ in 0..10 {
            sim.tick().await.unwrap();
        }
        let state = sim.snapshot().actor(id).unwrap();
        assert!(state.transform.rotation.yaw < 0.0);
        assert!(state.transform.location.y < 0.0);
    }

    #[tokio::test]
    async fn test_rear_end_collision_is_reported() {
        let mut sim = simulator();
        let rear = sim.spawn_actor("vehicle.audi.tt", at(0.0, 0.0)).await.unwrap();
        let front = sim.spawn_actor("vehicle.audi.tt", at(8.0, 0.0)).await.unwrap();
        // Adjacent lane, never collides.
        let side = sim.spawn_actor("vehicle.audi.tt", at(4.0, 3.5)).await.unwrap();
        sim.set_target_speed(rear, 10.0).await.unwrap();

        let mut collided = false;
        for _ in 0..10 {
            let snapshot = sim.tick().await.unwrap();
            assert!(!snapshot.collided(side));
            if snapshot.collided(rear) {
                assert!(snapshot.collided(front));
                collided = true;
                break;
            }
        }
        assert!(collided);
    }

    #[tokio::test]
    async fn test_spawn_on_top_of_actor_fails() {
        let mut sim = simulator();
        sim.spawn_actor("vehicle.audi.tt", at(0.0, 0.0)).await.unwrap();
        assert!(sim.spawn_actor("vehicle.nissan.patrol", at(1.0, 0.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_destroy_and_close() {
        let mut sim = simulator();
        let a = sim.spawn_actor("vehicle.audi.tt", at(0.0, 0.0)).await.unwrap();
        sim.spawn_actor("vehicle.audi.tt", at(20.0, 0.0)).await.unwrap();
        sim.destroy_actor(a).await.unwrap();
        assert!(sim.destroy_actor(a).await.is_err());
        assert_eq!(sim.snapshot().actors.len(), 1);
        sim.close().await.unwrap();
        assert!(sim.snapshot().actors.is_empty());
    }
}
