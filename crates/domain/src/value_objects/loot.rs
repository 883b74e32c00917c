//! Per-biome loot tables and container slot scattering.

use std::collections::HashMap;

use crate::error::DomainError;
use crate::value_objects::rarity::normalize_name;

/// One possible drop: an item identifier, an amount range, and an independent
/// percentage chance.
#[derive(Debug, Clone, PartialEq)]
pub struct LootEntry {
    item_id: String,
    min_amount: u32,
    max_amount: u32,
    drop_chance_percent: f64,
}

impl LootEntry {
    pub fn new(
        item_id: impl Into<String>,
        min_amount: u32,
        max_amount: u32,
        drop_chance_percent: f64,
    ) -> Result<Self, DomainError> {
        let item_id = item_id.into();
        if item_id.trim().is_empty() {
            return Err(DomainError::malformed_loot(item_id, "empty item id"));
        }
        if min_amount == 0 {
            return Err(DomainError::malformed_loot(item_id, "amount must be at least 1"));
        }
        if min_amount > max_amount {
            return Err(DomainError::malformed_loot(
                item_id,
                format!("min amount {min_amount} exceeds max amount {max_amount}"),
            ));
        }
        if !(0.0..=100.0).contains(&drop_chance_percent) {
            return Err(DomainError::malformed_loot(
                item_id,
                format!("drop chance {drop_chance_percent} outside [0, 100]"),
            ));
        }
        Ok(Self {
            item_id,
            min_amount,
            max_amount,
            drop_chance_percent,
        })
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn min_amount(&self) -> u32 {
        self.min_amount
    }

    pub fn max_amount(&self) -> u32 {
        self.max_amount
    }

    pub fn drop_chance_percent(&self) -> f64 {
        self.drop_chance_percent
    }
}

/// A rolled drop, not yet turned into a concrete item stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LootDrop {
    pub item_id: String,
    pub amount: u32,
}

impl LootDrop {
    pub fn new(item_id: impl Into<String>, amount: u32) -> Self {
        Self {
            item_id: item_id.into(),
            amount,
        }
    }
}

/// Loot entries per rarity category for one biome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LootTable {
    entries: HashMap<String, Vec<LootEntry>>,
}

impl LootTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: &str, entry: LootEntry) {
        self.entries
            .entry(normalize_name(category))
            .or_default()
            .push(entry);
    }

    pub fn entries(&self, category: &str) -> &[LootEntry] {
        self.entries
            .get(&normalize_name(category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

/// Loot tables keyed by biome, with a default table for unlisted biomes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BiomeLootTables {
    biomes: HashMap<String, LootTable>,
    default: LootTable,
}

impl BiomeLootTables {
    pub fn new(default: LootTable) -> Self {
        Self {
            biomes: HashMap::new(),
            default,
        }
    }

    pub fn insert_biome(&mut self, biome: &str, table: LootTable) {
        self.biomes.insert(normalize_name(biome), table);
    }

    pub fn biome_count(&self) -> usize {
        self.biomes.len()
    }

    /// Entries for `category` in `biome`, or the default table's entries when
    /// the biome has none for that category.
    pub fn entries(&self, biome: &str, category: &str) -> &[LootEntry] {
        let specific = self
            .biomes
            .get(&normalize_name(biome))
            .map(|table| table.entries(category))
            .unwrap_or(&[]);
        if specific.is_empty() {
            self.default.entries(category)
        } else {
            specific
        }
    }

    /// Roll every entry independently.
    ///
    /// `roll_percent()` returns a uniform value in `[0, 100)`;
    /// `amount(min, max)` returns a uniform integer in `[min, max]`.
    pub fn roll(
        &self,
        biome: &str,
        category: &str,
        mut roll_percent: impl FnMut() -> f64,
        mut amount: impl FnMut(u32, u32) -> u32,
    ) -> Vec<LootDrop> {
        self.entries(biome, category)
            .iter()
            .filter(|entry| roll_percent() < entry.drop_chance_percent)
            .map(|entry| {
                LootDrop::new(
                    entry.item_id.clone(),
                    amount(entry.min_amount, entry.max_amount),
                )
            })
            .collect()
    }
}

/// Minimal contents guaranteed for a category when rolling produced nothing.
pub fn fallback_loot(category: &str) -> Vec<LootDrop> {
    match normalize_name(category).as_str() {
        "MYTHIC" => vec![
            LootDrop::new("minecraft:netherite_ingot", 1),
            LootDrop::new("minecraft:diamond", 3),
        ],
        "LEGENDARY" => vec![
            LootDrop::new("minecraft:diamond", 2),
            LootDrop::new("minecraft:emerald", 4),
        ],
        "EPIC" => vec![
            LootDrop::new("minecraft:diamond", 1),
            LootDrop::new("minecraft:gold_ingot", 4),
        ],
        "RARE" => vec![
            LootDrop::new("minecraft:gold_ingot", 3),
            LootDrop::new("minecraft:iron_ingot", 5),
        ],
        _ => vec![
            LootDrop::new("minecraft:iron_ingot", 2),
            LootDrop::new("minecraft:bread", 4),
        ],
    }
}

/// Place `items` into random slots of a container with `capacity` slots.
///
/// `pick(n)` returns a uniform index in `[0, n)`. Items beyond `capacity` are
/// not placed; their count is returned alongside the slot layout.
pub fn scatter_into_slots<T>(
    items: Vec<T>,
    capacity: usize,
    mut pick: impl FnMut(usize) -> usize,
) -> (Vec<Option<T>>, usize) {
    let mut slot_order: Vec<usize> = (0..capacity).collect();
    // Fisher-Yates
    for i in (1..slot_order.len()).rev() {
        let j = pick(i + 1).min(i);
        slot_order.swap(i, j);
    }

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(capacity).collect();
    let mut overflow = 0;
    for (index, item) in items.into_iter().enumerate() {
        match slot_order.get(index) {
            Some(&slot) => slots[slot] = Some(item),
            None => overflow += 1,
        }
    }
    (slots, overflow)
}
