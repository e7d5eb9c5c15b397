use clap::Parser;
use once_cell::sync::Lazy;
use rand::Rng;

use crate::config::{RunArgs, RunContext, ScenarioKind, TriggerPoint};
use crate::env::{MAX_FRONT_GAP, Observation};
use crate::scenario::{ScenarioInstance, ScenarioSource};

/// Creates a fresh empty directory under the system temp directory and
/// returns its path.
pub fn create_tmp_directory() -> String {
    let name = format!("safe_bench_test_{:016x}", rand::rng().random::<u64>());
    let path = std::env::temp_dir().join(name);
    std::fs::create_dir_all(&path).unwrap();
    path.to_string_lossy().into_owned()
}

/// An observation of an ego vehicle standing still on its route, with
/// nothing ahead.
pub fn observation() -> Observation {
    Observation {
        front_gap: MAX_FRONT_GAP,
        ..Default::default()
    }
}

/// A leading vehicle scenario on lane 0 of a straight road.
pub fn instance(scenario_id: usize) -> ScenarioInstance {
    ScenarioInstance {
        scenario_id,
        route_id: 0,
        source: ScenarioSource::Scripted(ScenarioKind::LeadingVehicle),
        trigger_point: TriggerPoint { lane_id: 0, s: 10.0 },
        route_length: 150.0,
        parameters: Vec::new(),
    }
}

/// Loads the run context for the given command line, on top of the defaults.
/// The output directory is a fresh temporary directory.
pub fn run_context(args: &[&str]) -> &'static RunContext {
    let output_dir = create_tmp_directory();
    let mut argv = vec!["run", "--output_dir", output_dir.as_str()];
    argv.extend_from_slice(args);
    RunContext::load(RunArgs::try_parse_from(argv).unwrap()).unwrap()
}

static DEFAULT_RUN_CONTEXT: Lazy<&'static RunContext> = Lazy::new(|| run_context(&[]));

/// The run context of the default configs, loaded once.
pub fn default_run_context() -> &'static RunContext {
    &DEFAULT_RUN_CONTEXT
}
