//! Reward lifecycle errors.

use treasure_domain::DomainError;

use crate::infrastructure::ports::WorldError;

/// Errors that can occur while spawning or retiring a reward.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Unknown rarity category: {0}")]
    UnknownCategory(String),
    #[error("World error: {0}")]
    World(#[from] WorldError),
    #[error("Invalid reward state: {0}")]
    Domain(#[from] DomainError),
}
