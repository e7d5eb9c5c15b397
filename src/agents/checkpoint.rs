use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Training progress saved next to a model so a run can continue from it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub name: String,
    /// Number of episodes trained when the checkpoint was written.
    pub episode: u32,
}

impl Checkpoint {
    pub fn path(directory: &Path, name: &str) -> PathBuf {
        directory.join(format!("{name}.checkpoint.json"))
    }

    pub fn save(&self, directory: &Path) -> Result<()> {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create directory {}", directory.display()))?;
        let path = Self::path(directory, &self.name);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write checkpoint {}", path.display()))?;
        tracing::info!("Saved checkpoint of {} at episode {}", self.name, self.episode);
        Ok(())
    }

    /// Load the checkpoint for `name`, or None if none was saved yet.
    pub fn load(directory: &Path, name: &str) -> Result<Option<Self>> {
        let path = Self::path(directory, name);
        if !path.exists() {
            tracing::warn!("No checkpoint found at {}", path.display());
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read checkpoint {}", path.display()))?;
        let checkpoint = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse checkpoint {}", path.display()))?;
        Ok(Some(checkpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_save_and_load() {
        let directory = PathBuf::from(testing::create_tmp_directory()).join("model");
        assert_eq!(Checkpoint::load(&directory, "ego").unwrap(), None);

        let checkpoint = Checkpoint {
            name: "ego".to_string(),
            episode: 40,
        };
        checkpoint.save(&directory).unwrap();
        assert_eq!(Checkpoint::load(&directory, "ego").unwrap(), Some(checkpoint));
        assert_eq!(Checkpoint::load(&directory, "other").unwrap(), None);
    }
}
