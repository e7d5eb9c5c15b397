use anyhow::{Result, ensure};
use rand::Rng;

use crate::scoring::BoundingBox;

/// One camera frame of one scenario slot, as seen by a perception agent.
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionTransition {
    pub slot: usize,
    /// Detector output for the frame.
    pub predictions: Vec<BoundingBox>,
    /// Texture applied by the attacking scenario.
    pub attack: Vec<f32>,
    /// Flattened first-person image.
    pub image: Vec<f32>,
    pub label: BoundingBox,
    /// Detection loss of the frame.
    pub loss: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionBatch {
    pub label: Vec<BoundingBox>,
    pub image: Vec<Vec<f32>>,
    pub loss: Vec<f32>,
}

#[derive(Debug, Default)]
struct PerceptionSlot {
    labels: Vec<BoundingBox>,
    predictions: Vec<Vec<BoundingBox>>,
    attacks: Vec<Vec<f32>>,
    images: Vec<Vec<f32>>,
    losses: Vec<f32>,
}

/// Stores image observations and detection labels of parallel scenarios.
#[derive(Debug)]
pub struct PerceptionReplayBuffer {
    capacity: usize,
    num_scenario: usize,
    len: usize,
    slots: Vec<PerceptionSlot>,
}

impl PerceptionReplayBuffer {
    pub fn new(num_scenario: usize, capacity: usize) -> Self {
        Self {
            capacity,
            num_scenario,
            len: 0,
            slots: (0..num_scenario).map(|_| PerceptionSlot::default()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn store(&mut self, transitions: Vec<PerceptionTransition>) -> Result<()> {
        for transition in transitions {
            ensure!(
                transition.slot < self.num_scenario,
                "Scenario slot {} out of range for {} scenarios",
                transition.slot,
                self.num_scenario
            );
            let slot = &mut self.slots[transition.slot];
            slot.labels.push(transition.label);
            slot.predictions.push(transition.predictions);
            slot.attacks.push(transition.attack);
            slot.images.push(transition.image);
            slot.losses.push(transition.loss);
            self.len += 1;
        }
        Ok(())
    }

    /// Predictions stored for a slot, oldest first.
    pub fn predictions(&self, slot: usize) -> Option<&[Vec<BoundingBox>]> {
        self.slots.get(slot).map(|s| s.predictions.as_slice())
    }

    /// Attack textures stored for a slot, oldest first.
    pub fn attacks(&self, slot: usize) -> Option<&[Vec<f32>]> {
        self.slots.get(slot).map(|s| s.attacks.as_slice())
    }

    pub fn sample<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<PerceptionBatch> {
        let samples_per_slot = self.capacity / self.num_scenario.max(1);
        let mut labels: Vec<&BoundingBox> = Vec::new();
        let mut images: Vec<&Vec<f32>> = Vec::new();
        let mut losses: Vec<f32> = Vec::new();
        for slot in &self.slots {
            let start = slot.losses.len().saturating_sub(samples_per_slot);
            labels.extend(&slot.labels[start..]);
            images.extend(&slot.images[start..]);
            losses.extend(&slot.losses[start..]);
        }
        ensure!(!losses.is_empty(), "Cannot sample from an empty perception buffer");

        let mut batch = PerceptionBatch {
            label: Vec::with_capacity(batch_size),
            image: Vec::with_capacity(batch_size),
            loss: Vec::with_capacity(batch_size),
        };
        for _ in 0..batch_size {
            let i = rng.random_range(0..losses.len());
            batch.label.push(*labels[i]);
            batch.image.push(images[i].clone());
            batch.loss.push(losses[i]);
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn frame(slot: usize, loss: f32) -> PerceptionTransition {
        let label = BoundingBox {
            x_min: 0.0,
            y_min: 0.0,
            x_max: loss as f64,
            y_max: 1.0,
            class_id: 1,
        };
        PerceptionTransition {
            slot,
            predictions: vec![label],
            attack: vec![0.5; 4],
            image: vec![loss; 3],
            label,
            loss,
        }
    }

    #[test]
    fn test_store_and_sample() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut buffer = PerceptionReplayBuffer::new(2, 4);
        buffer
            .store(vec![frame(0, 1.0), frame(1, 2.0), frame(0, 3.0), frame(0, 4.0)])
            .unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.predictions(0).unwrap().len(), 3);
        assert_eq!(buffer.attacks(1).unwrap().len(), 1);

        let batch = buffer.sample(16, &mut rng).unwrap();
        assert_eq!(batch.loss.len(), 16);
        for ((label, image), loss) in batch.label.iter().zip(&batch.image).zip(&batch.loss) {
            // Slot 0 keeps only its two latest frames.
            assert!(*loss != 1.0);
            assert_eq!(image[0], *loss);
            assert_eq!(label.x_max, *loss as f64);
        }
    }

    #[test]
    fn test_invalid_slot_and_empty_sample() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut buffer = PerceptionReplayBuffer::new(1, 4);
        assert!(buffer.sample(1, &mut rng).is_err());
        assert!(buffer.store(vec![frame(1, 1.0)]).is_err());
    }
}
