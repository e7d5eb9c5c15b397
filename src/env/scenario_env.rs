use anyhow::{Context, Result};
use serde::Serialize;

use crate::env::{EgoAction, Observation};
use crate::scenario::{ScenarioBehavior, ScenarioInstance, build_scenario};
use crate::scoring::PlanningRecord;
use crate::sim::{ActorId, ActorState, Location, Route, Simulator, Snapshot};

const LATERAL_PENALTY: f64 = 0.1;
const COLLISION_PENALTY: f64 = 100.0;

/// Per-step diagnostics of one scenario slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepInfo {
    pub slot: usize,
    pub scenario_id: usize,
    pub collision: bool,
    pub out_of_road: bool,
    /// Current lateral distance to the route centerline, in metres.
    pub distance_to_route: f64,
    pub route_completion: f64,
    /// 1 when the step violated a safety constraint, else 0.
    pub cost: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub slot: usize,
    pub obs: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// One ego vehicle driving one scenario instance inside a shared simulator.
pub struct ScenarioEnv {
    slot: usize,
    instance: ScenarioInstance,
    route: Route,
    scenario: Box<dyn ScenarioBehavior>,
    ego: ActorId,
    max_episode_step: u32,
    step_count: u32,
    started_at: f64,
    last_s: f64,
    last_location: Location,
    observation: Observation,
    out_of_road_length: f64,
    distance_to_route_sum: f64,
    episode_reward: f64,
    collided: bool,
    running_time: f64,
    done: bool,
}

impl ScenarioEnv {
    /// Spawn the ego vehicle at the start of the instance's route and set up
    /// the scenario's traffic. The caller ticks the simulator afterwards and
    /// then calls `observe_reset`.
    pub async fn reset(
        sim: &mut dyn Simulator,
        slot: usize,
        instance: ScenarioInstance,
        init_action: &[f64],
        ego_blueprint: &str,
        max_episode_step: u32,
    ) -> Result<Self> {
        let route = instance.route(sim.map())?;
        let start = instance.reference_waypoint(sim.map())?;
        let mut scenario = build_scenario(&instance, sim.map(), init_action)?;

        let ego = sim
            .spawn_actor(ego_blueprint, start.transform)
            .await
            .with_context(|| format!("Failed to spawn ego vehicle of {}", instance.name()))?;
        if let Err(err) = scenario.initialize_actors(sim).await {
            scenario.clean_up(sim).await?;
            sim.destroy_actor(ego).await?;
            return Err(err.context(format!("Failed to initialize {}", instance.name())));
        }
        tracing::debug!(
            "Slot {} runs {} with {} actors",
            slot,
            scenario.name(),
            scenario.actors().len()
        );

        Ok(Self {
            slot,
            instance,
            route,
            scenario,
            ego,
            max_episode_step,
            step_count: 0,
            started_at: sim.snapshot().elapsed_seconds,
            last_s: route.start_s,
            last_location: start.transform.location,
            observation: Observation::default(),
            out_of_road_length: 0.0,
            distance_to_route_sum: 0.0,
            episode_reward: 0.0,
            collided: false,
            running_time: 0.0,
            done: false,
        })
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn instance(&self) -> &ScenarioInstance {
        &self.instance
    }

    pub fn ego(&self) -> ActorId {
        self.ego
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn episode_reward(&self) -> f64 {
        self.episode_reward
    }

    fn ego_state<'a>(&self, snapshot: &'a Snapshot) -> Result<&'a ActorState> {
        snapshot
            .actor(self.ego)
            .with_context(|| format!("Ego vehicle {} of slot {} is gone", self.ego, self.slot))
    }

    fn compute_observation(&self, sim: &dyn Simulator) -> Result<Observation> {
        let snapshot = sim.snapshot();
        let ego = self.ego_state(snapshot)?;
        let others = snapshot.actors.values().filter(|actor| actor.id != self.ego);
        Observation::compute(sim.map(), &self.route, ego, others)
    }

    /// Observation right after the reset tick.
    pub fn observe_reset(&mut self, sim: &dyn Simulator) -> Result<Observation> {
        self.observation = self.compute_observation(sim)?;
        self.started_at = sim.snapshot().elapsed_seconds;
        Ok(self.observation)
    }

    /// Let the scenario command its actors and hand the ego action to the
    /// simulator. Takes effect on the next tick.
    pub async fn apply(&mut self, sim: &mut dyn Simulator, action: &EgoAction) -> Result<()> {
        if self.done {
            return Ok(());
        }
        self.scenario.update_behavior(sim).await?;
        sim.apply_control(self.ego, action.to_control()).await
    }

    /// Score the ticks since the last `apply`. `collided` tells whether the
    /// ego vehicle collided during any of them.
    pub fn observe(&mut self, sim: &dyn Simulator, collided: bool) -> Result<StepOutcome> {
        let observation = self.compute_observation(sim)?;
        let snapshot = sim.snapshot();
        let location = self.ego_state(snapshot)?.transform.location;
        let map = sim.map();

        let s = self.route.start_s + observation.route_completion * self.route.length();
        let progress = s - self.last_s;
        let out_of_road = !map.is_on_road(&location);
        if out_of_road {
            self.out_of_road_length += location.distance_2d(&self.last_location);
        }
        let distance_to_route = observation.lateral_offset.abs();

        let mut reward = progress - LATERAL_PENALTY * distance_to_route;
        if collided {
            reward -= COLLISION_PENALTY;
        }

        self.step_count += 1;
        self.last_s = s;
        self.last_location = location;
        self.observation = observation;
        self.distance_to_route_sum += distance_to_route;
        self.episode_reward += reward;
        self.collided |= collided;
        self.running_time = snapshot.elapsed_seconds - self.started_at;

        let route_complete = observation.route_completion >= 1.0;
        self.done = collided
            || route_complete
            || self.scenario.check_stop_condition(snapshot)
            || self.step_count >= self.max_episode_step;

        Ok(StepOutcome {
            slot: self.slot,
            obs: observation,
            reward,
            done: self.done,
            info: StepInfo {
                slot: self.slot,
                scenario_id: self.instance.scenario_id,
                collision: collided,
                out_of_road,
                distance_to_route,
                route_completion: observation.route_completion,
                cost: if collided || out_of_road { 1.0 } else { 0.0 },
            },
        })
    }

    /// Planning metrics of the episode so far.
    pub fn record(&self) -> PlanningRecord {
        PlanningRecord {
            scenario_id: self.instance.scenario_id,
            route_id: self.instance.route_id,
            collided: self.collided,
            out_of_road_length: self.out_of_road_length,
            distance_to_route: if self.step_count == 0 {
                0.0
            } else {
                self.distance_to_route_sum / self.step_count as f64
            },
            route_completion: self.observation.route_completion,
            running_time: self.running_time,
            episode_reward: self.episode_reward,
        }
    }

    /// Remove the scenario's actors and the ego vehicle from the world.
    pub async fn clean_up(&mut self, sim: &mut dyn Simulator) -> Result<()> {
        self.scenario.clean_up(sim).await?;
        sim.destroy_actor(self.ego).await
    }
}
