use std::path::Path;

use ahash::AHashSet as HashSet;
use anyhow::{Context, Result, ensure};

use crate::config::{RunContext, ScenarioCategory, ScenarioKind, ScenarioSpec, TriggerPoint};
use crate::scenario::ScenicScene;
use crate::sim::{RoadMap, Route, Waypoint};

/// What populates a scenario instance with traffic.
#[derive(Debug, Clone)]
pub enum ScenarioSource {
    Scripted(ScenarioKind),
    Scenic(ScenicScene),
}

/// One scenario to be run: where the ego vehicle starts, how far it has to
/// drive and which traffic it meets.
#[derive(Debug, Clone)]
pub struct ScenarioInstance {
    pub scenario_id: usize,
    pub route_id: usize,
    pub source: ScenarioSource,
    pub trigger_point: TriggerPoint,
    pub route_length: f64,
    /// Stored perturbation parameters, each in [0, 1].
    pub parameters: Vec<f64>,
}

impl ScenarioInstance {
    pub fn name(&self) -> String {
        match &self.source {
            ScenarioSource::Scripted(kind) => {
                format!("{:?}_{}_{}", kind, self.scenario_id, self.route_id)
            }
            ScenarioSource::Scenic(scene) => format!("{}_{}", scene.name, self.scenario_id),
        }
    }

    /// The ego vehicle's start, at the trigger point.
    pub fn reference_waypoint(&self, map: &RoadMap) -> Result<Waypoint> {
        map.waypoint_at(self.trigger_point.lane_id, self.trigger_point.s)
    }

    pub fn route(&self, map: &RoadMap) -> Result<Route> {
        let start = self.reference_waypoint(map)?;
        let (end, _) = map.advance(&start, self.route_length)?;
        Ok(Route {
            lane_id: start.lane_id,
            start_s: start.s,
            end_s: end.s,
        })
    }

    /// Features describing the instance before it runs, fed to scenario
    /// policies that pick the initial perturbation.
    pub fn static_observation(&self) -> Vec<f32> {
        vec![
            self.trigger_point.lane_id as f32,
            self.trigger_point.s as f32,
            self.route_length as f32,
        ]
    }
}

/// Build the scenario instances of a run, ordered by scenario id.
pub fn load_instances(context: &RunContext) -> Result<Vec<ScenarioInstance>> {
    let config = context.scenario;
    let root_dir = &context.args.root_dir;
    let mut instances = match config.type_category {
        ScenarioCategory::Scenic => {
            let directory = config
                .scenic_scene_dir
                .as_ref()
                .context("Scenic scenarios need scenic_scene_dir")?;
            ScenicScene::load_dir(&root_dir.join(directory))?
                .into_iter()
                .enumerate()
                .map(|(scenario_id, scene)| ScenarioInstance {
                    scenario_id,
                    route_id: 0,
                    trigger_point: scene.ego_start,
                    route_length: scene.route_length.unwrap_or(config.ego.route_length),
                    parameters: Vec::new(),
                    source: ScenarioSource::Scenic(scene),
                })
                .collect()
        }
        ScenarioCategory::Standard | ScenarioCategory::AdvTrajectory => config
            .scenarios
            .iter()
            .map(|spec| {
                Ok(ScenarioInstance {
                    scenario_id: spec.scenario_id,
                    route_id: spec.route_id,
                    source: ScenarioSource::Scripted(spec.kind),
                    trigger_point: spec.trigger_point,
                    route_length: config.ego.route_length,
                    parameters: load_parameters(spec, root_dir)?,
                })
            })
            .collect::<Result<Vec<_>>>()?,
    };
    ensure!(!instances.is_empty(), "No scenarios configured");
    let mut seen = HashSet::new();
    for instance in &instances {
        ensure!(
            seen.insert(instance.scenario_id),
            "Scenario id {} is configured more than once",
            instance.scenario_id
        );
    }
    instances.sort_by_key(|instance| instance.scenario_id);
    tracing::info!("Loaded {} scenario instances", instances.len());
    Ok(instances)
}

fn load_parameters(spec: &ScenarioSpec, root_dir: &Path) -> Result<Vec<f64>> {
    let parameters = match &spec.parameters_file {
        Some(file) => {
            let path = root_dir.join(file);
            let contents = std::fs::read_to_string(&path).with_context(|| {
                format!("Failed to read scenario parameters {}", path.display())
            })?;
            serde_json::from_str::<Vec<f64>>(&contents).with_context(|| {
                format!("Failed to parse scenario parameters {}", path.display())
            })?
        }
        None => spec.parameters.clone(),
    };
    ensure!(
        parameters.iter().all(|p| (0.0..=1.0).contains(p)),
        "Parameters of scenario {} must lie in [0, 1], got {:?}",
        spec.scenario_id,
        parameters
    );
    Ok(parameters)
}

/// Split instances into batches that run side by side, one per scenario slot.
pub fn batches(instances: &[ScenarioInstance], num_scenario: usize) -> Vec<Vec<ScenarioInstance>> {
    instances
        .chunks(num_scenario.max(1))
        .map(<[ScenarioInstance]>::to_vec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoadableConfig, RunArgs, ScenarioConfig};
    use crate::testing;
    use clap::Parser;

    /// A run context for a standard scenario config with the given scenarios.
    fn context_with_scenarios(scenarios: &str) -> Result<&'static RunContext> {
        let output_dir = testing::create_tmp_directory();
        let args = RunArgs::try_parse_from(["run", "--output_dir", output_dir.as_str()])?;
        let scenario =
            ScenarioConfig::from_string(&format!("type_category = \"standard\"\n{scenarios}"))?;
        RunContext::new(args, testing::default_run_context().agent, scenario)
    }

    #[test]
    fn test_load_standard_instances() {
        let context = testing::run_context(&["--scenario_cfg", "standard.toml"]);
        let instances = load_instances(context).unwrap();
        assert!(!instances.is_empty());
        assert!(
            instances
                .windows(2)
                .all(|pair| pair[0].scenario_id <= pair[1].scenario_id)
        );
    }

    #[test]
    fn test_parameters_file_is_read() {
        let context = testing::run_context(&["--scenario_cfg", "adv_trajectory.toml"]);
        let instances = load_instances(context).unwrap();
        assert!(instances.iter().all(|i| !i.parameters.is_empty()));
    }

    #[test]
    fn test_route_is_clamped_to_lane() {
        let map = RoadMap::straight_road(1, 100.0, 3.5).unwrap();
        let mut instance = testing::instance(0);
        instance.trigger_point = TriggerPoint { lane_id: 0, s: 40.0 };
        instance.route_length = 150.0;
        let route = instance.route(&map).unwrap();
        assert_eq!(route.start_s, 40.0);
        assert_eq!(route.end_s, 100.0);
    }

    #[test]
    fn test_batches() {
        let instances: Vec<_> = (0..5).map(testing::instance).collect();
        let sizes: Vec<usize> = batches(&instances, 2).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batches(&instances, 2)[2][0].scenario_id, 4);
    }

    #[test]
    fn test_duplicate_scenario_ids_are_rejected() -> Result<()> {
        let context = context_with_scenarios(
            r#"
            [[scenarios]]
            scenario_id = 0
            route_id = 0
            kind = "leading_vehicle"
            trigger_point = { lane_id = 0, s = 20.0 }

            [[scenarios]]
            scenario_id = 0
            route_id = 1
            kind = "leading_vehicle"
            trigger_point = { lane_id = 0, s = 300.0 }
            "#,
        )?;
        let err = load_instances(context).unwrap_err();
        assert!(format!("{err:#}").contains("Scenario id 0 is configured more than once"));
        Ok(())
    }

    #[test]
    fn test_inline_parameters_out_of_range_are_rejected() -> Result<()> {
        let scenario = |parameters: &str| {
            format!(
                r#"
                [[scenarios]]
                scenario_id = 0
                kind = "other_leading_vehicle"
                trigger_point = {{ lane_id = 0, s = 20.0 }}
                parameters = {parameters}
                "#
            )
        };
        let context = context_with_scenarios(&scenario("[0.2, 5.0]"))?;
        let err = load_instances(context).unwrap_err();
        assert!(format!("{err:#}").contains("must lie in [0, 1]"));

        let context = context_with_scenarios(&scenario("[0.0, 0.5, 1.0]"))?;
        let instances = load_instances(context)?;
        assert_eq!(instances[0].parameters, vec![0.0, 0.5, 1.0]);
        Ok(())
    }
}
