use std::path::PathBuf;

use serde::Deserialize;

/// Configuration for trajectory recording.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrajectoryRecorderConfig {
    /// No trajectory recording (disabled).
    #[default]
    Disabled,
    /// Record rows to a directory, relative to the experiment directory.
    Directory {
        data_directory: PathBuf,
        flush_row_count: usize,
    },
}
