use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{MapConfig, RunContext, SimulatorConfig};
use crate::sim::{BridgeOptions, BridgeSimulator, KinematicSimulator, RoadMap, Simulator};

pub fn build_map(config: &MapConfig, root_dir: &Path) -> Result<RoadMap> {
    match config {
        MapConfig::StraightRoad {
            num_lanes,
            length,
            lane_width,
        } => RoadMap::straight_road(*num_lanes, *length, *lane_width),
        MapConfig::File { path } => {
            let path = root_dir.join(path);
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read map from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse map from {}", path.display()))
        }
    }
}

/// Start the in-process simulator or connect to the external one.
pub async fn build_simulator(context: &RunContext) -> Result<Box<dyn Simulator>> {
    let args = &context.args;
    match &context.scenario.simulator {
        SimulatorConfig::Kinematic => {
            if args.save_video {
                tracing::warn!("The kinematic simulator renders nothing, no video is saved");
            }
            let map = build_map(&context.scenario.map, &args.root_dir)?;
            tracing::info!(
                "Starting kinematic simulator on {} with {} lanes",
                map.name,
                map.lanes().len()
            );
            Ok(Box::new(KinematicSimulator::new(
                map,
                args.fixed_delta_seconds,
            )))
        }
        SimulatorConfig::Bridge { town } => {
            let options = BridgeOptions {
                host: args.host.clone(),
                port: args.port,
                tm_port: args.tm_port,
                fixed_delta_seconds: args.fixed_delta_seconds,
                render: args.render,
                town: town.clone(),
            };
            Ok(Box::new(BridgeSimulator::connect(&options).await?))
        }
    }
}
