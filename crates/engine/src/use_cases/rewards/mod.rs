//! Reward use cases.
//!
//! Selection decides whether an action earns a reward; the lifecycle places,
//! fills, tracks, and retires the container that holds it.

use std::sync::Arc;

mod error;
mod lifecycle;
mod select_reward;

pub use error::LifecycleError;
pub use lifecycle::{BreakOutcome, RewardLifecycle, SpawnRequest};
pub use select_reward::RewardSelector;

/// Container for reward use cases.
pub struct RewardUseCases {
    pub selector: Arc<RewardSelector>,
    pub lifecycle: Arc<RewardLifecycle>,
}

impl RewardUseCases {
    pub fn new(selector: Arc<RewardSelector>, lifecycle: Arc<RewardLifecycle>) -> Self {
        Self {
            selector,
            lifecycle,
        }
    }
}
