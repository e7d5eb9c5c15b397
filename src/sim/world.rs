use ahash::AHashMap as HashMap;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::sim::geometry::Transform;
use crate::sim::map::RoadMap;

pub type ActorId = u32;

/// Front wheel angle at full steering lock, in radians.
pub const MAX_STEER_ANGLE: f64 = 0.6;

/// Distance between the axles of a passenger car, in metres.
pub const WHEELBASE: f64 = 2.8;

/// Low-level vehicle command, following CARLA's VehicleControl ranges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleControl {
    /// In [0, 1].
    pub throttle: f32,
    /// In [-1, 1], positive steers right.
    pub steer: f32,
    /// In [0, 1].
    pub brake: f32,
}

impl VehicleControl {
    pub fn clamped(self) -> Self {
        Self {
            throttle: self.throttle.clamp(0.0, 1.0),
            steer: self.steer.clamp(-1.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
        }
    }
}

/// Per-actor state reported after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: ActorId,
    pub transform: Transform,
    /// Forward speed in m/s.
    pub speed: f64,
    /// Half of the vehicle length, in metres.
    pub half_length: f64,
    /// Half of the vehicle width, in metres.
    pub half_width: f64,
}

/// A collision reported by the simulator between two actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub actor: ActorId,
    pub other: ActorId,
}

impl CollisionEvent {
    pub fn involves(&self, id: ActorId) -> bool {
        self.actor == id || self.other == id
    }
}

/// World state after a tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub frame: u64,
    /// Simulated seconds since the world was set up.
    pub elapsed_seconds: f64,
    pub actors: HashMap<ActorId, ActorState>,
    /// Collisions that happened during the last tick.
    pub collisions: Vec<CollisionEvent>,
}

impl Snapshot {
    pub fn actor(&self, id: ActorId) -> Option<&ActorState> {
        self.actors.get(&id)
    }

    pub fn collided(&self, id: ActorId) -> bool {
        self.collisions.iter().any(|event| event.involves(id))
    }
}

/// The interface to a running simulator. Time only advances on `tick`
/// (synchronous mode); controls applied in between take effect on the next tick.
#[async_trait]
pub trait Simulator: Send {
    fn map(&self) -> &RoadMap;

    /// Spawn a vehicle with the given blueprint, e.g. `vehicle.audi.tt`.
    async fn spawn_actor(&mut self, blueprint: &str, transform: Transform) -> Result<ActorId>;

    async fn destroy_actor(&mut self, id: ActorId) -> Result<()>;

    async fn apply_control(&mut self, id: ActorId, control: VehicleControl) -> Result<()>;

    /// Drive the actor at a constant forward speed, bypassing its controller.
    async fn set_target_speed(&mut self, id: ActorId, speed: f64) -> Result<()>;

    async fn tick(&mut self) -> Result<Snapshot>;

    /// The snapshot produced by the latest tick, or the initial state.
    fn snapshot(&self) -> &Snapshot;

    /// Destroy everything that is still alive. Used when a run is aborted.
    async fn close(&mut self) -> Result<()>;
}
