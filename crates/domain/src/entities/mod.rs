//! Entities - domain objects with identity and a lifecycle

pub mod reward;

pub use reward::{Reward, RewardPhase};
