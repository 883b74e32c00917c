//! In-memory state storage modules.
//!
//! Stores manage runtime state that doesn't belong in the database:
//! - `RulesStore` - Active rarity table, spawn policy, and loot tables
//! - `StatsCache` - Stats for users with an active session
//! - `RewardRegistry` - Live rewards and the positions they occupy

pub mod rewards;
pub mod rules;
pub mod stats;

// Re-export store types
pub use rewards::{RewardRegistry, TrackedReward};
pub use rules::{RewardRules, RulesStore};
pub use stats::StatsCache;
