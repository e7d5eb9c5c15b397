use serde::{Deserialize, Serialize};

use crate::scoring::Track;

/// IoU a prediction needs with its label to count as a correct detection.
pub const IOU_THRESHOLD: f64 = 0.5;

/// Axis-aligned box in image pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    pub class_id: u32,
}

impl BoundingBox {
    pub fn area(&self) -> f64 {
        (self.x_max - self.x_min).max(0.0) * (self.y_max - self.y_min).max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let width = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let height = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        let intersection = width * height;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 { 0.0 } else { intersection / union }
    }
}

/// Detector output for one labelled frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PerceptionRecord {
    pub scenario_id: usize,
    pub label: BoundingBox,
    pub predictions: Vec<BoundingBox>,
}

impl PerceptionRecord {
    /// Best IoU among predictions of the labelled class.
    pub fn best_iou(&self) -> f64 {
        self.predictions
            .iter()
            .filter(|p| p.class_id == self.label.class_id)
            .map(|p| p.iou(&self.label))
            .fold(0.0, f64::max)
    }

    pub fn is_correct(&self) -> bool {
        self.best_iou() >= IOU_THRESHOLD
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PerceptionSummary {
    pub num_frames: usize,
    pub iou: f64,
    pub accuracy: f64,
    pub final_score: f64,
}

impl PerceptionSummary {
    pub fn from_records(records: &[PerceptionRecord], track: Track) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let n = records.len() as f64;
        let iou = records.iter().map(PerceptionRecord::best_iou).sum::<f64>() / n;
        let accuracy = records.iter().filter(|r| r.is_correct()).count() as f64 / n;
        Self {
            num_frames: records.len(),
            iou,
            accuracy,
            final_score: track.orient(0.5 * iou + 0.5 * accuracy),
        }
    }
}
