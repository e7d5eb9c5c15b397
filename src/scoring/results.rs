use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scoring::{PerceptionRecord, PerceptionSummary, PlanningRecord, PlanningSummary, Track};

const RESULTS_FILE_NAME: &str = "results.json";

/// Evaluation results of an experiment, persisted as JSON so an interrupted
/// evaluation resumes where it stopped.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EvaluationResults {
    pub track: Track,
    #[serde(default)]
    pub planning: Vec<PlanningRecord>,
    #[serde(default)]
    pub perception: Vec<PerceptionRecord>,
    #[serde(default)]
    pub planning_summary: Option<PlanningSummary>,
    #[serde(default)]
    pub perception_summary: Option<PerceptionSummary>,
}

impl EvaluationResults {
    pub fn new(track: Track) -> Self {
        Self {
            track,
            planning: Vec::new(),
            perception: Vec::new(),
            planning_summary: None,
            perception_summary: None,
        }
    }

    pub fn path(experiment_dir: &Path) -> PathBuf {
        experiment_dir.join(RESULTS_FILE_NAME)
    }

    /// Load previous results from the experiment directory, or start fresh.
    /// Results scored under another track are discarded.
    pub fn load_or_new(experiment_dir: &Path, track: Track) -> Result<Self> {
        let path = Self::path(experiment_dir);
        if !path.exists() {
            return Ok(Self::new(track));
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read results from {}", path.display()))?;
        let results: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse results from {}", path.display()))?;
        if results.track != track {
            tracing::warn!(
                "Ignoring previous results scored under the {} track",
                results.track
            );
            return Ok(Self::new(track));
        }
        tracing::info!(
            "Resuming evaluation with {} scored scenarios",
            results.scored_scenarios().len()
        );
        Ok(results)
    }

    /// Ids of scenarios that already have a record.
    pub fn scored_scenarios(&self) -> BTreeSet<usize> {
        self.planning
            .iter()
            .map(|r| r.scenario_id)
            .chain(self.perception.iter().map(|r| r.scenario_id))
            .collect()
    }

    pub fn add_planning(&mut self, record: PlanningRecord) {
        self.planning.retain(|r| r.scenario_id != record.scenario_id);
        self.planning.push(record);
    }

    pub fn add_perception(&mut self, records: impl IntoIterator<Item = PerceptionRecord>) {
        self.perception.extend(records);
    }

    pub fn summarize(&mut self) {
        self.planning_summary = (!self.planning.is_empty())
            .then(|| PlanningSummary::from_records(&self.planning, self.track));
        self.perception_summary = (!self.perception.is_empty())
            .then(|| PerceptionSummary::from_records(&self.perception, self.track));
    }

    /// Add the perception records in a JSON file to the results of an
    /// experiment and save them.
    pub fn score_perception_file(
        records_path: &Path,
        experiment_dir: &Path,
        track: Track,
    ) -> Result<Self> {
        let contents = std::fs::read_to_string(records_path).with_context(|| {
            format!("Failed to read records from {}", records_path.display())
        })?;
        let records: Vec<PerceptionRecord> = serde_json::from_str(&contents).with_context(|| {
            format!("Failed to parse records from {}", records_path.display())
        })?;
        let mut results = Self::load_or_new(experiment_dir, track)?;
        results.add_perception(records);
        results.summarize();
        results.save(experiment_dir)?;
        Ok(results)
    }

    pub fn save(&self, experiment_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(experiment_dir).with_context(|| {
            format!("Failed to create directory {}", experiment_dir.display())
        })?;
        let path = Self::path(experiment_dir);
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::BoundingBox;
    use crate::testing;

    fn record(scenario_id: usize) -> PlanningRecord {
        PlanningRecord {
            scenario_id,
            route_id: 0,
            collided: scenario_id % 2 == 0,
            out_of_road_length: 0.0,
            distance_to_route: 0.1,
            route_completion: 1.0,
            running_time: 12.0,
            episode_reward: 3.0,
        }
    }

    #[test]
    fn test_save_and_resume() {
        let directory = PathBuf::from(testing::create_tmp_directory());
        let mut results =
            EvaluationResults::load_or_new(&directory, Track::PlanningDefense).unwrap();
        assert!(results.scored_scenarios().is_empty());

        results.add_planning(record(0));
        results.add_planning(record(1));
        results.add_planning(record(1));
        results.summarize();
        results.save(&directory).unwrap();

        let resumed = EvaluationResults::load_or_new(&directory, Track::PlanningDefense).unwrap();
        assert_eq!(resumed.planning.len(), 2);
        assert_eq!(resumed.scored_scenarios(), BTreeSet::from([0, 1]));
        let summary = resumed.planning_summary.unwrap();
        assert!((summary.collision_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_other_track_starts_fresh() {
        let directory = PathBuf::from(testing::create_tmp_directory());
        let mut results = EvaluationResults::new(Track::PlanningDefense);
        results.add_planning(record(0));
        results.save(&directory).unwrap();

        let other = EvaluationResults::load_or_new(&directory, Track::PlanningAttack).unwrap();
        assert!(other.planning.is_empty());
    }

    #[test]
    fn test_score_perception_file() {
        let directory = PathBuf::from(testing::create_tmp_directory());
        let label = BoundingBox {
            x_min: 0.0,
            y_min: 0.0,
            x_max: 10.0,
            y_max: 10.0,
            class_id: 1,
        };
        let records = vec![
            PerceptionRecord {
                scenario_id: 0,
                label,
                predictions: vec![label],
            },
            PerceptionRecord {
                scenario_id: 1,
                label,
                predictions: Vec::new(),
            },
        ];
        let records_path = directory.join("records.json");
        std::fs::write(&records_path, serde_json::to_string(&records).unwrap()).unwrap();

        let experiment_dir = directory.join("exp");
        let results = EvaluationResults::score_perception_file(
            &records_path,
            &experiment_dir,
            Track::PerceptionDefense,
        )
        .unwrap();
        let summary = results.perception_summary.unwrap();
        assert_eq!(summary.num_frames, 2);
        assert!((summary.accuracy - 0.5).abs() < 1e-12);

        let saved =
            EvaluationResults::load_or_new(&experiment_dir, Track::PerceptionDefense).unwrap();
        assert_eq!(saved.perception, records);
    }
}
