mod perception;
mod replay;

pub use perception::{PerceptionBatch, PerceptionReplayBuffer, PerceptionTransition};
pub use replay::{Batch, InitBatch, InitTransition, ReplayBuffer, Transition};
