use anyhow::{Context, Result, ensure};

use crate::sim::{
    ActorId, MAX_STEER_ANGLE, Simulator, Transform, VehicleControl, WHEELBASE, normalize_angle,
};

const SPEED_GAIN: f64 = 0.5;

/// Control helpers shared by scenarios. Actors are addressed by the index in
/// which they were spawned.
#[derive(Debug, Default)]
pub struct ScenarioOperation {
    actors: Vec<ActorId>,
}

impl ScenarioOperation {
    pub fn actors(&self) -> &[ActorId] {
        &self.actors
    }

    fn actor(&self, index: usize) -> Result<ActorId> {
        self.actors
            .get(index)
            .copied()
            .with_context(|| format!("Scenario has no actor with index {index}"))
    }

    /// Spawn one vehicle per transform. On failure the vehicles spawned so far
    /// stay registered so they can be cleaned up.
    pub async fn initialize_vehicle_actors(
        &mut self,
        sim: &mut dyn Simulator,
        transforms: &[Transform],
        blueprints: &[&str],
    ) -> Result<()> {
        ensure!(
            transforms.len() == blueprints.len(),
            "Got {} transforms for {} blueprints",
            transforms.len(),
            blueprints.len()
        );
        for (transform, blueprint) in transforms.iter().zip(blueprints) {
            let id = sim.spawn_actor(blueprint, *transform).await?;
            self.actors.push(id);
        }
        Ok(())
    }

    /// Keep the actor driving straight ahead at a constant speed.
    pub async fn go_straight(
        &self,
        sim: &mut dyn Simulator,
        index: usize,
        target_speed: f64,
    ) -> Result<()> {
        sim.set_target_speed(self.actor(index)?, target_speed).await
    }

    /// Steer the actor towards a target transform while tracking a speed.
    pub async fn drive_to_target_followlane(
        &self,
        sim: &mut dyn Simulator,
        index: usize,
        target: &Transform,
        target_speed: f64,
    ) -> Result<()> {
        let id = self.actor(index)?;
        let state = *sim
            .snapshot()
            .actor(id)
            .with_context(|| format!("Actor {id} is not in the world"))?;
        let control = follow_control(&state.transform, state.speed, target, target_speed);
        sim.apply_control(id, control).await
    }
}

/// Pure pursuit steering towards the target location and proportional
/// throttle and brake towards the target speed.
pub fn follow_control(
    current: &Transform,
    speed: f64,
    target: &Transform,
    target_speed: f64,
) -> VehicleControl {
    let delta = target.location - current.location;
    let distance = delta.x.hypot(delta.y);
    let steer = if distance < 1e-3 {
        0.0
    } else {
        let alpha = normalize_angle(delta.y.atan2(delta.x) - current.rotation.yaw_radians());
        let wheel_angle = (2.0 * WHEELBASE * alpha.sin() / distance.max(1.0)).atan();
        -wheel_angle / MAX_STEER_ANGLE
    };

    let acceleration = SPEED_GAIN * (target_speed - speed);
    VehicleControl {
        throttle: acceleration.max(0.0) as f32,
        steer: steer as f32,
        brake: (-acceleration).max(0.0) as f32,
    }
    .clamped()
}
