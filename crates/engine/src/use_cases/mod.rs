//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.
//! Use cases orchestrate across stores and ports to fulfill user stories.

pub mod admin;
pub mod luck;
pub mod rewards;
pub mod session;

// Re-export main types
pub use admin::{AdminUseCases, PlayerInfo};
pub use luck::{LuckError, LuckStatus, LuckUseCases};
pub use rewards::{
    BreakOutcome, LifecycleError, RewardLifecycle, RewardSelector, RewardUseCases, SpawnRequest,
};
pub use session::SessionUseCases;
