//! Per-source spawn chances and the reward decision.
//!
//! A source type with an override rolls each category independently, rarest
//! first, and the first success wins. Chances are not normalised across
//! categories: at high luck multipliers the combined probability of *some*
//! reward can approach certainty, and a chance above 100% always succeeds.
//!
//! A source type without an override defers to the global chance roll followed
//! by a weighted pick from the [`RarityTable`].

use std::collections::HashMap;

use crate::error::DomainError;
use crate::value_objects::rarity::{normalize_name, RarityCategory, RarityTable};

/// Percentage chances per category for one source type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceOverride {
    chances: HashMap<String, f64>,
}

impl SourceOverride {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chance for `category`, validated against `table`.
    pub fn insert(
        &mut self,
        table: &RarityTable,
        category: &str,
        chance_percent: f64,
    ) -> Result<(), DomainError> {
        let category = table
            .get(category)
            .ok_or_else(|| DomainError::unknown_category(category))?;
        if !(0.0..=100.0).contains(&chance_percent) {
            return Err(DomainError::validation(format!(
                "Chance for {} must be within [0, 100], got {chance_percent}",
                category.name()
            )));
        }
        self.chances
            .insert(category.name().to_string(), chance_percent);
        Ok(())
    }

    /// Chance for `category`; absent categories have a 0.0 chance.
    pub fn chance_for(&self, category: &str) -> f64 {
        self.chances
            .get(&normalize_name(category))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.chances.is_empty()
    }
}

/// Outcome of evaluating a source type against its override table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnDecision<'a> {
    /// An override roll succeeded.
    Category(&'a RarityCategory),
    /// An override exists but every roll failed.
    NoReward,
    /// No override for this source type - apply the global policy.
    DeferToGlobal,
}

/// Global fallback chance plus per-source overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPolicy {
    global_chance_percent: f64,
    overrides: HashMap<String, SourceOverride>,
}

impl SpawnPolicy {
    pub fn new(global_chance_percent: f64) -> Result<Self, DomainError> {
        if !(0.0..=100.0).contains(&global_chance_percent) {
            return Err(DomainError::validation(format!(
                "Global chance must be within [0, 100], got {global_chance_percent}"
            )));
        }
        Ok(Self {
            global_chance_percent,
            overrides: HashMap::new(),
        })
    }

    pub fn global_chance_percent(&self) -> f64 {
        self.global_chance_percent
    }

    /// Register the override table for `source_type`, replacing any previous one.
    pub fn set_override(
        &mut self,
        source_type: &str,
        source_override: SourceOverride,
    ) -> Result<(), DomainError> {
        let key = validate_source_type(source_type)?;
        self.overrides.insert(key, source_override);
        Ok(())
    }

    pub fn override_for(&self, source_type: &str) -> Option<&SourceOverride> {
        self.overrides.get(&normalize_name(source_type))
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Roll the per-source override table for `source_type`.
    ///
    /// `roll_percent()` must return a fresh uniform value in `[0, 100)`.
    pub fn evaluate<'a>(
        &self,
        table: &'a RarityTable,
        source_type: &str,
        luck_multiplier: f64,
        mut roll_percent: impl FnMut() -> f64,
    ) -> SpawnDecision<'a> {
        let Some(source_override) = self.override_for(source_type) else {
            return SpawnDecision::DeferToGlobal;
        };

        for category in table.rarest_first() {
            let base_chance = source_override.chance_for(category.name());
            if base_chance <= 0.0 {
                continue;
            }
            let effective_chance = base_chance * luck_multiplier;
            if roll_percent() < effective_chance {
                return SpawnDecision::Category(category);
            }
        }

        SpawnDecision::NoReward
    }

    /// Full reward decision for one action.
    ///
    /// `draw(bound)` must return a uniform integer in `[0, bound)`.
    pub fn decide<'a>(
        &self,
        table: &'a RarityTable,
        source_type: &str,
        luck_multiplier: f64,
        mut roll_percent: impl FnMut() -> f64,
        draw: impl FnOnce(u32) -> u32,
    ) -> Option<&'a RarityCategory> {
        match self.evaluate(table, source_type, luck_multiplier, &mut roll_percent) {
            SpawnDecision::Category(category) => Some(category),
            SpawnDecision::NoReward => None,
            SpawnDecision::DeferToGlobal => {
                let effective_chance = self.global_chance_percent * luck_multiplier;
                if roll_percent() < effective_chance {
                    Some(table.pick(draw))
                } else {
                    None
                }
            }
        }
    }
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        Self {
            global_chance_percent: 1.0,
            overrides: HashMap::new(),
        }
    }
}

/// Source types are identifiers such as `DIAMOND_ORE` or `minecraft:stone`.
fn validate_source_type(source_type: &str) -> Result<String, DomainError> {
    let key = normalize_name(source_type);
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'));
    if valid {
        Ok(key)
    } else {
        Err(DomainError::invalid_source_type(source_type))
    }
}
