//! Value objects - Immutable objects defined by their attributes

mod loot;
mod position;
mod rarity;
mod spawn_policy;

pub use loot::{fallback_loot, scatter_into_slots, BiomeLootTables, LootDrop, LootEntry, LootTable};
pub use position::Position;
pub use rarity::{normalize_name, RarityCategory, RarityTable};
pub use spawn_policy::{SourceOverride, SpawnDecision, SpawnPolicy};
