//! Treasure domain layer.
//!
//! Pure types and algorithms for reward selection: rarity tables, spawn
//! policy, the luck boost state machine, loot tables, and player stats.
//! Nothing here performs I/O. Randomness is injected through closures so the
//! engine decides where numbers come from and tests can fix them.

extern crate self as treasure_domain;

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use aggregates::{
    BoostOutcome, LuckPhase, LuckState, PlayerStats, MULTIPLIER_TOLERANCE, NEUTRAL_MULTIPLIER,
};
pub use entities::{Reward, RewardPhase};
pub use error::DomainError;
pub use ids::{RewardId, UserId};
pub use value_objects::{
    fallback_loot, normalize_name, scatter_into_slots, BiomeLootTables, LootDrop, LootEntry,
    LootTable, Position, RarityCategory, RarityTable, SourceOverride, SpawnDecision, SpawnPolicy,
};
