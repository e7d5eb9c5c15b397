use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The four challenge categories. Attack tracks score the scenario generator,
/// defense tracks score the ego agent.
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Track {
    PerceptionAttack,
    PerceptionDefense,
    PlanningAttack,
    PlanningDefense,
}

impl Track {
    pub fn is_perception(&self) -> bool {
        matches!(self, Track::PerceptionAttack | Track::PerceptionDefense)
    }

    pub fn is_attack(&self) -> bool {
        matches!(self, Track::PerceptionAttack | Track::PlanningAttack)
    }

    /// Turn a score where higher means a better driving or detection outcome
    /// into the score of this track.
    pub fn orient(&self, defense_score: f64) -> f64 {
        if self.is_attack() {
            1.0 - defense_score
        } else {
            defense_score
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Track::PerceptionAttack => "perception attack",
            Track::PerceptionDefense => "perception defense",
            Track::PlanningAttack => "planning attack",
            Track::PlanningDefense => "planning defense",
        };
        f.write_str(name)
    }
}
