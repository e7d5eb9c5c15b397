use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::de::DeserializeOwned;

use crate::config::{AgentConfig, RunArgs, ScenarioCategory, ScenarioConfig};

pub trait LoadableConfig: Sized + DeserializeOwned {
    /// Given a string, parse it into a config and produce a static
    /// reference to it.
    fn from_string(string: &str) -> Result<&'static mut Self> {
        let config = toml::from_str::<Self>(string).context("Failed to parse config")?;
        Ok(Box::leak(Box::new(config)))
    }

    /// Given a path, read the file into a string and produce a static
    /// reference to it.
    fn from_file(path: &Path) -> Result<&'static mut Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from path: {}", path.display()))?;
        Self::from_string(&contents)
            .with_context(|| format!("Failed to load config from path: {}", path.display()))
    }
}

impl LoadableConfig for AgentConfig {}

impl LoadableConfig for ScenarioConfig {}

/// Everything a runner needs: the command-line arguments together with the
/// agent and scenario configs they name. Command-line values win over config
/// files wherever both exist.
#[derive(Debug)]
pub struct RunContext {
    pub args: RunArgs,
    pub agent: &'static AgentConfig,
    pub scenario: &'static ScenarioConfig,
}

impl RunContext {
    /// Load the agent and scenario configs named by the arguments.
    pub fn load(args: RunArgs) -> Result<&'static Self> {
        let agent = AgentConfig::from_file(&args.agent_config_path())?;
        let scenario = ScenarioConfig::from_file(&args.scenario_config_path())?;
        Self::new(args, agent, scenario)
    }

    pub fn new(
        args: RunArgs,
        agent: &'static AgentConfig,
        scenario: &'static ScenarioConfig,
    ) -> Result<&'static Self> {
        ensure!(args.num_scenario > 0, "num_scenario must be at least one");
        ensure!(args.frame_skip > 0, "frame_skip must be at least one");
        ensure!(
            args.fixed_delta_seconds > 0.0,
            "fixed_delta_seconds must be positive"
        );
        ensure!(
            !scenario.track.is_perception(),
            "The {} track is scored offline with score-perception, not by the driving runner",
            scenario.track
        );
        if scenario.type_category == ScenarioCategory::Scenic {
            ensure!(
                args.num_scenario == 1,
                "num_scenario can only be one for scenic scenarios, got {}",
                args.num_scenario
            );
        }
        Ok(Box::leak(Box::new(Self {
            args,
            agent,
            scenario,
        })))
    }
}
