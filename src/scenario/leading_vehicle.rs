use anyhow::Result;
use async_trait::async_trait;

use crate::scenario::{ScenarioBehavior, ScenarioOperation};
use crate::sim::{ActorId, Simulator, Waypoint};

const VEHICLE_DISTANCE: f64 = 25.0;
const VEHICLE_SPEED: f64 = 6.0;
const BLUEPRINT: &str = "vehicle.audi.tt";

/// A single vehicle drives ahead of the ego vehicle at a constant speed.
pub struct LeadingVehicle {
    reference_waypoint: Waypoint,
    operation: ScenarioOperation,
}

impl LeadingVehicle {
    pub fn new(reference_waypoint: Waypoint) -> Self {
        Self {
            reference_waypoint,
            operation: ScenarioOperation::default(),
        }
    }
}

#[async_trait]
impl ScenarioBehavior for LeadingVehicle {
    fn name(&self) -> &str {
        "FollowLeadingVehicle"
    }

    async fn initialize_actors(&mut self, sim: &mut dyn Simulator) -> Result<()> {
        let (waypoint, _) = sim.map().advance(&self.reference_waypoint, VEHICLE_DISTANCE)?;
        self.operation
            .initialize_vehicle_actors(sim, &[waypoint.transform], &[BLUEPRINT])
            .await
    }

    async fn update_behavior(&mut self, sim: &mut dyn Simulator) -> Result<()> {
        self.operation.go_straight(sim, 0, VEHICLE_SPEED).await
    }

    fn actors(&self) -> &[ActorId] {
        self.operation.actors()
    }
}
