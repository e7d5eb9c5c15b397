use anyhow::{Context, Result, ensure};
use async_trait::async_trait;

use crate::scenario::{ScenarioBehavior, ScenarioOperation};
use crate::sim::{ActorId, Simulator, Transform, Waypoint};

const FIRST_VEHICLE_DISTANCE: f64 = 35.0;
const SECOND_VEHICLE_DISTANCE: f64 = FIRST_VEHICLE_DISTANCE + 1.0;
const VEHICLE_SPEED: f64 = 12.0;
/// The front vehicle starts following the perturbed trajectory once it has
/// moved this far from its spawn point.
const DECELERATION_DISTANCE: f64 = 2.0;
const DECELERATION_TARGET_SPEED: f64 = 3.0;
/// Forward extent of the perturbed trajectory, in metres.
const RUNNING_DISTANCE: f64 = 50.0;
/// Lateral offset at a parameter of 0 or 1, in metres.
const MAX_LATERAL_OFFSET: f64 = 2.0;
const BLUEPRINTS: [&str; 2] = ["vehicle.nissan.patrol", "vehicle.audi.tt"];

/// Two vehicles lead the ego vehicle on a multi-lane road: one in the ego lane
/// and one in the lane to its left. The vehicle in the ego lane decelerates and
/// weaves along a trajectory perturbed by the scenario policy.
pub struct OtherLeadingVehicle {
    reference_waypoint: Waypoint,
    control_seq: Vec<f64>,
    operation: ScenarioOperation,
    spawn_transforms: Vec<Transform>,
    perturbed_transforms: Vec<Transform>,
    need_decelerate: bool,
    step: usize,
}

impl OtherLeadingVehicle {
    /// `parameters` are in [0, 1]; each becomes one lateral offset of the
    /// perturbed trajectory.
    pub fn new(reference_waypoint: Waypoint, parameters: &[f64]) -> Result<Self> {
        ensure!(
            !parameters.is_empty(),
            "OtherLeadingVehicle needs at least one trajectory parameter"
        );
        Ok(Self {
            reference_waypoint,
            control_seq: parameters
                .iter()
                .map(|p| (p * 2.0 - 1.0) * MAX_LATERAL_OFFSET)
                .collect(),
            operation: ScenarioOperation::default(),
            spawn_transforms: Vec::new(),
            perturbed_transforms: Vec::new(),
            need_decelerate: false,
            step: 0,
        })
    }

    pub fn total_steps(&self) -> usize {
        self.control_seq.len()
    }

    pub fn perturbed_transforms(&self) -> &[Transform] {
        &self.perturbed_transforms
    }

    /// Evenly spaced points over the running distance, each shifted sideways
    /// by its entry of the control sequence.
    fn plan_trajectory(&mut self, first_transform: &Transform) {
        let total_steps = self.total_steps() as f64;
        let forward = first_transform.rotation.forward_vector() * RUNNING_DISTANCE;
        let right = first_transform.rotation.right_vector();
        self.perturbed_transforms = self
            .control_seq
            .iter()
            .enumerate()
            .map(|(i, offset)| {
                let along = first_transform.location + forward * (i as f64 / total_steps);
                Transform::new(along + right * *offset, first_transform.rotation)
            })
            .collect();
    }
}

#[async_trait]
impl ScenarioBehavior for OtherLeadingVehicle {
    fn name(&self) -> &str {
        "VehicleDeceleratingInMultiLaneSetUpDynamic"
    }

    async fn initialize_actors(&mut self, sim: &mut dyn Simulator) -> Result<()> {
        let map = sim.map();
        let (first_waypoint, _) = map.advance(&self.reference_waypoint, FIRST_VEHICLE_DISTANCE)?;
        let (second_waypoint, _) =
            map.advance(&self.reference_waypoint, SECOND_VEHICLE_DISTANCE)?;
        let second_waypoint = map
            .left_lane(&second_waypoint)
            .context("OtherLeadingVehicle needs a lane to the left of the trigger point")?;

        let first_transform = first_waypoint.transform;
        self.spawn_transforms = vec![first_transform, second_waypoint.transform];
        self.plan_trajectory(&first_transform);

        let spawn_transforms = self.spawn_transforms.clone();
        self.operation
            .initialize_vehicle_actors(sim, &spawn_transforms, &BLUEPRINTS)
            .await
    }

    async fn update_behavior(&mut self, sim: &mut dyn Simulator) -> Result<()> {
        let front = *self
            .operation
            .actors()
            .first()
            .context("OtherLeadingVehicle actors are not initialized")?;
        let current = sim
            .snapshot()
            .actor(front)
            .with_context(|| format!("Leading actor {front} is not in the world"))?
            .transform;
        if self.spawn_transforms[0].distance(&current) > DECELERATION_DISTANCE {
            self.need_decelerate = true;
        }

        for index in 0..self.operation.actors().len() {
            if index == 0 && self.need_decelerate {
                let target = self.perturbed_transforms[self.step.min(self.total_steps() - 1)];
                self.step += 1;
                self.operation
                    .drive_to_target_followlane(sim, index, &target, DECELERATION_TARGET_SPEED)
                    .await?;
            } else {
                self.operation.go_straight(sim, index, VEHICLE_SPEED).await?;
            }
        }
        Ok(())
    }

    fn actors(&self) -> &[ActorId] {
        self.operation.actors()
    }
}
