mod behavior;
mod data;
mod leading_vehicle;
mod operation;
mod other_leading_vehicle;
mod policy;
mod scenic;

pub use behavior::ScenarioBehavior;
pub use data::{ScenarioInstance, ScenarioSource, batches, load_instances};
pub use leading_vehicle::LeadingVehicle;
pub use operation::{ScenarioOperation, follow_control};
pub use other_leading_vehicle::OtherLeadingVehicle;
pub use policy::{FixedParameters, RandomParameters, ScenarioPolicy, build_scenario_policy};
pub use scenic::{ScenicActor, ScenicScenario, ScenicScene};

use anyhow::Result;

use crate::config::ScenarioKind;
use crate::sim::RoadMap;

/// Build the traffic of an instance, perturbed by the scenario policy's
/// initial action where the scenario supports it.
pub fn build_scenario(
    instance: &ScenarioInstance,
    map: &RoadMap,
    init_action: &[f64],
) -> Result<Box<dyn ScenarioBehavior>> {
    let reference_waypoint = instance.reference_waypoint(map)?;
    Ok(match &instance.source {
        ScenarioSource::Scripted(ScenarioKind::LeadingVehicle) => {
            Box::new(LeadingVehicle::new(reference_waypoint))
        }
        ScenarioSource::Scripted(ScenarioKind::OtherLeadingVehicle) => {
            Box::new(OtherLeadingVehicle::new(reference_waypoint, init_action)?)
        }
        ScenarioSource::Scenic(scene) => Box::new(ScenicScenario::new(scene.clone())),
    })
}
