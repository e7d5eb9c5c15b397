mod bridge;
mod geometry;
mod kinematic;
mod map;
mod world;

pub use bridge::{BridgeOptions, BridgeRequest, BridgeResponse, BridgeSimulator};
pub use geometry::{Location, Rotation, Transform, normalize_angle};
pub use kinematic::KinematicSimulator;
pub use map::{Lane, LaneId, Projection, RoadMap, Route, Waypoint};
pub use world::{
    ActorId, ActorState, CollisionEvent, MAX_STEER_ANGLE, Simulator, Snapshot, VehicleControl,
    WHEELBASE,
};
