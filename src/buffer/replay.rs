use std::collections::BTreeMap;

use anyhow::{Result, ensure};
use rand::Rng;

use crate::config::Mode;

/// One environment step of one scenario slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Index of the scenario within the parallel batch.
    pub slot: usize,
    pub ego_action: Vec<f32>,
    pub scenario_action: Vec<f32>,
    pub obs: Vec<f32>,
    pub next_obs: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    /// Extra per-step values such as cost.
    pub additional: BTreeMap<String, f32>,
}

/// Initial conditions chosen by the scenario policy for one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct InitTransition {
    pub slot: usize,
    pub static_obs: Vec<f32>,
    pub init_action: Vec<f32>,
    pub additional: BTreeMap<String, Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub action: Vec<Vec<f32>>,
    pub state: Vec<Vec<f32>>,
    pub next_state: Vec<Vec<f32>>,
    pub reward: Vec<f32>,
    pub done: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitBatch {
    pub init_action: Vec<Vec<f32>>,
    pub episode_reward: Vec<f32>,
    pub additional: BTreeMap<String, Vec<Vec<f32>>>,
}

#[derive(Debug, Default)]
struct SlotBuffer {
    ego_actions: Vec<Vec<f32>>,
    scenario_actions: Vec<Vec<f32>>,
    obs: Vec<Vec<f32>>,
    next_obs: Vec<Vec<f32>>,
    rewards: Vec<f32>,
    dones: Vec<bool>,
    additional: BTreeMap<String, Vec<f32>>,
}

impl SlotBuffer {
    fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Sum of rewards of the latest finished trajectory: everything after the
    /// second-to-last done marker up to and including the last one. Without
    /// any done marker the whole slot counts as one trajectory.
    fn last_episode_reward(&self) -> f32 {
        let done_indexes: Vec<usize> = self
            .dones
            .iter()
            .enumerate()
            .filter_map(|(i, &done)| done.then_some(i))
            .collect();
        let end = match done_indexes.last() {
            Some(&end) => end + 1,
            None => self.rewards.len(),
        };
        let start = if done_indexes.len() > 1 {
            done_indexes[done_indexes.len() - 2] + 1
        } else {
            0
        };
        self.rewards[start..end].iter().sum()
    }
}

#[derive(Debug)]
struct InitRow {
    slot: usize,
    static_obs: Vec<f32>,
    init_action: Vec<f32>,
    additional: BTreeMap<String, Vec<f32>>,
    episode_reward: Option<f32>,
}

/// Stores transitions of several scenarios running in parallel, keeping each
/// scenario's trajectory separate.
#[derive(Debug)]
pub struct ReplayBuffer {
    mode: Mode,
    capacity: usize,
    num_scenario: usize,
    len: usize,
    slots: Vec<SlotBuffer>,
    init_rows: Vec<InitRow>,
}

impl ReplayBuffer {
    pub fn new(num_scenario: usize, mode: Mode, capacity: usize) -> Self {
        Self {
            mode,
            capacity,
            num_scenario,
            len: 0,
            slots: (0..num_scenario).map(|_| SlotBuffer::default()).collect(),
            init_rows: Vec::new(),
        }
    }

    /// Total number of transitions stored since the last reset.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn init_len(&self) -> usize {
        self.init_rows.len()
    }

    pub fn reset(&mut self) {
        self.slots = (0..self.num_scenario).map(|_| SlotBuffer::default()).collect();
        self.len = 0;
    }

    pub fn reset_init(&mut self) {
        self.init_rows.clear();
    }

    pub fn store(&mut self, transitions: Vec<Transition>) -> Result<()> {
        for transition in transitions {
            ensure!(
                transition.slot < self.num_scenario,
                "Scenario slot {} out of range for {} scenarios",
                transition.slot,
                self.num_scenario
            );
            let slot = &mut self.slots[transition.slot];
            slot.ego_actions.push(transition.ego_action);
            slot.scenario_actions.push(transition.scenario_action);
            slot.obs.push(transition.obs);
            slot.next_obs.push(transition.next_obs);
            slot.rewards.push(transition.reward);
            slot.dones.push(transition.done);
            for (key, value) in transition.additional {
                slot.additional.entry(key).or_default().push(value);
            }
            self.len += 1;
        }
        Ok(())
    }

    pub fn store_init(&mut self, transitions: Vec<InitTransition>) -> Result<()> {
        for transition in transitions {
            ensure!(
                transition.slot < self.num_scenario,
                "Scenario slot {} out of range for {} scenarios",
                transition.slot,
                self.num_scenario
            );
            self.init_rows.push(InitRow {
                slot: transition.slot,
                static_obs: transition.static_obs,
                init_action: transition.init_action,
                additional: transition.additional,
                episode_reward: None,
            });
        }
        Ok(())
    }

    /// Attach the total reward of the episode that just ended to the initial
    /// conditions that produced it.
    pub fn finish_one_episode(&mut self) {
        for row in self.init_rows.iter_mut().filter(|r| r.episode_reward.is_none()) {
            row.episode_reward = Some(self.slots[row.slot].last_episode_reward());
        }
    }

    /// Extra values recorded for a slot, keyed by name.
    pub fn additional(&self, slot: usize) -> Option<&BTreeMap<String, Vec<f32>>> {
        self.slots.get(slot).map(|s| &s.additional)
    }

    /// Sample transitions uniformly with replacement from the latest
    /// `capacity / num_scenario` transitions of every scenario.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Batch> {
        let samples_per_slot = self.capacity / self.num_scenario.max(1);

        let mut actions: Vec<&Vec<f32>> = Vec::new();
        let mut states: Vec<&Vec<f32>> = Vec::new();
        let mut next_states: Vec<&Vec<f32>> = Vec::new();
        let mut rewards: Vec<f32> = Vec::new();
        let mut dones: Vec<bool> = Vec::new();
        for slot in &self.slots {
            let start = slot.len().saturating_sub(samples_per_slot);
            let slot_actions = match self.mode {
                Mode::TrainAgent => &slot.ego_actions,
                _ => &slot.scenario_actions,
            };
            actions.extend(&slot_actions[start..]);
            states.extend(&slot.obs[start..]);
            next_states.extend(&slot.next_obs[start..]);
            rewards.extend(&slot.rewards[start..]);
            dones.extend(&slot.dones[start..]);
        }
        ensure!(!rewards.is_empty(), "Cannot sample from an empty replay buffer");

        let mut batch = Batch {
            action: Vec::with_capacity(batch_size),
            state: Vec::with_capacity(batch_size),
            next_state: Vec::with_capacity(batch_size),
            reward: Vec::with_capacity(batch_size),
            done: Vec::with_capacity(batch_size),
        };
        for _ in 0..batch_size {
            let i = rng.random_range(0..rewards.len());
            batch.action.push(actions[i].clone());
            batch.state.push(states[i].clone());
            batch.next_state.push(next_states[i].clone());
            batch.reward.push(rewards[i]);
            batch.done.push(dones[i]);
        }
        Ok(batch)
    }

    /// Sample initial conditions with their episode rewards, uniformly with
    /// replacement from the latest `capacity` finished episodes.
    pub fn sample_init<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<InitBatch> {
        let finished: Vec<&InitRow> = self
            .init_rows
            .iter()
            .filter(|r| r.episode_reward.is_some())
            .collect();
        let start = finished.len().saturating_sub(self.capacity);
        let prepared = &finished[start..];
        ensure!(!prepared.is_empty(), "Cannot sample from an empty init buffer");

        let mut batch = InitBatch {
            init_action: Vec::with_capacity(batch_size),
            episode_reward: Vec::with_capacity(batch_size),
            additional: BTreeMap::new(),
        };
        for _ in 0..batch_size {
            let row = prepared[rng.random_range(0..prepared.len())];
            batch.init_action.push(row.init_action.clone());
            batch.episode_reward.push(row.episode_reward.unwrap_or_default());
            for (key, value) in &row.additional {
                batch
                    .additional
                    .entry(key.clone())
                    .or_default()
                    .push(value.clone());
            }
        }
        Ok(batch)
    }

    /// Static observations of the stored initial conditions, oldest first.
    pub fn static_observations(&self) -> impl Iterator<Item = &[f32]> {
        self.init_rows.iter().map(|r| r.static_obs.as_slice())
    }
}
