//! Reward rules storage for runtime state.
//!
//! Holds the active rarity table, spawn policy, and loot tables behind a
//! single swappable `Arc`. Readers take a snapshot and keep it for the whole
//! decision, so a reload never mixes old and new rules mid-action.

use std::sync::{Arc, RwLock};

use treasure_domain::{BiomeLootTables, RarityTable, SpawnPolicy};

/// Everything that decides which rewards spawn and what they contain.
#[derive(Debug, Clone, Default)]
pub struct RewardRules {
    pub rarity: RarityTable,
    pub policy: SpawnPolicy,
    pub loot: BiomeLootTables,
}

/// Atomically replaceable holder for the active [`RewardRules`].
pub struct RulesStore {
    current: RwLock<Arc<RewardRules>>,
}

impl RulesStore {
    pub fn new(rules: RewardRules) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
        }
    }

    /// Snapshot of the rules in force right now.
    pub fn current(&self) -> Arc<RewardRules> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in new rules, returning the previous ones.
    pub fn replace(&self, rules: RewardRules) -> Arc<RewardRules> {
        let next = Arc::new(rules);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

impl Default for RulesStore {
    fn default() -> Self {
        Self::new(RewardRules::default())
    }
}
