//! Reward selection use case.
//!
//! Decides whether a qualifying action spawns a reward and of which rarity.

use std::sync::Arc;

use treasure_domain::RarityCategory;

use crate::infrastructure::ports::RandomPort;
use crate::stores::RulesStore;

/// Rolls per-source overrides first, then the global chance and weighted
/// pick, scaled by the caller's luck multiplier.
pub struct RewardSelector {
    rules: Arc<RulesStore>,
    random: Arc<dyn RandomPort>,
}

impl RewardSelector {
    pub fn new(rules: Arc<RulesStore>, random: Arc<dyn RandomPort>) -> Self {
        Self { rules, random }
    }

    /// Category to spawn for an action on `source_type`, or `None`.
    pub fn select(&self, source_type: &str, luck_multiplier: f64) -> Option<RarityCategory> {
        let rules = self.rules.current();
        rules
            .policy
            .decide(
                &rules.rarity,
                source_type,
                luck_multiplier,
                || self.random.gen_percent(),
                |bound| self.random.gen_below(bound),
            )
            .cloned()
    }

    /// Weighted pick from the rarity table, ignoring spawn chances.
    pub fn pick_category(&self) -> RarityCategory {
        let rules = self.rules.current();
        rules.rarity.pick(|bound| self.random.gen_below(bound)).clone()
    }
}
