use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TriggerPoint;
use crate::scenario::{ScenarioBehavior, ScenarioOperation};
use crate::sim::{ActorId, Simulator, Transform};

/// A scene sampled from a Scenic program by the external Scenic tooling and
/// exported as JSON.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenicScene {
    pub name: String,
    /// Where the ego vehicle starts.
    pub ego_start: TriggerPoint,
    /// Overrides the configured route length.
    #[serde(default)]
    pub route_length: Option<f64>,
    pub actors: Vec<ScenicActor>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScenicActor {
    pub blueprint: String,
    pub transform: Transform,
    /// Constant forward speed in m/s.
    #[serde(default)]
    pub speed: f64,
}

impl ScenicScene {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenic scene {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse scenic scene {}", path.display()))
    }

    /// Load every `.json` scene in a directory, sorted by file name.
    pub fn load_dir(directory: &Path) -> Result<Vec<Self>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(directory)
            .with_context(|| format!("Failed to read scenic scenes from {}", directory.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        paths.iter().map(|path| Self::from_file(path)).collect()
    }
}

/// Replays a scenic scene: actors spawn where the scene puts them and keep
/// their sampled speed.
pub struct ScenicScenario {
    scene: ScenicScene,
    operation: ScenarioOperation,
}

impl ScenicScenario {
    pub fn new(scene: ScenicScene) -> Self {
        Self {
            scene,
            operation: ScenarioOperation::default(),
        }
    }
}

#[async_trait]
impl ScenarioBehavior for ScenicScenario {
    fn name(&self) -> &str {
        &self.scene.name
    }

    async fn initialize_actors(&mut self, sim: &mut dyn Simulator) -> Result<()> {
        let transforms: Vec<Transform> = self.scene.actors.iter().map(|a| a.transform).collect();
        let blueprints: Vec<&str> = self
            .scene
            .actors
            .iter()
            .map(|a| a.blueprint.as_str())
            .collect();
        self.operation
            .initialize_vehicle_actors(sim, &transforms, &blueprints)
            .await
    }

    async fn update_behavior(&mut self, sim: &mut dyn Simulator) -> Result<()> {
        for (index, actor) in self.scene.actors.iter().enumerate() {
            self.operation.go_straight(sim, index, actor.speed).await?;
        }
        Ok(())
    }

    fn actors(&self) -> &[ActorId] {
        self.operation.actors()
    }
}
