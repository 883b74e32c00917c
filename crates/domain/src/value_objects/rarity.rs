//! Rarity categories and the weighted global category draw.
//!
//! Categories are declared from most common to rarest. The weighted draw walks
//! them in declaration order; per-source rolls walk them in reverse (rarest
//! first).

use std::fmt;

use crate::error::DomainError;

/// A named reward tier.
///
/// # Invariants
///
/// - `name` is non-empty and stored upper-case
/// - `weight` is strictly positive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarityCategory {
    name: String,
    weight: u32,
    reward_duration_secs: u64,
    display_tag: String,
}

impl RarityCategory {
    pub fn new(
        name: impl AsRef<str>,
        weight: u32,
        reward_duration_secs: u64,
        display_tag: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let name = normalize_name(name.as_ref());
        if name.is_empty() {
            return Err(DomainError::validation("Category name cannot be empty"));
        }
        if weight == 0 {
            return Err(DomainError::validation(format!(
                "Category {name} must have a positive weight"
            )));
        }
        Ok(Self {
            name,
            weight,
            reward_duration_secs,
            display_tag: display_tag.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Seconds a spawned reward of this category persists before it expires.
    pub fn reward_duration_secs(&self) -> u64 {
        self.reward_duration_secs
    }

    pub fn display_tag(&self) -> &str {
        &self.display_tag
    }
}

impl fmt::Display for RarityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Category names are matched case-insensitively.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// The fixed set of rarity categories, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarityTable {
    categories: Vec<RarityCategory>,
    total_weight: u32,
}

impl RarityTable {
    pub fn new(categories: Vec<RarityCategory>) -> Result<Self, DomainError> {
        if categories.is_empty() {
            return Err(DomainError::validation(
                "Rarity table needs at least one category",
            ));
        }

        let mut total_weight: u32 = 0;
        for (index, category) in categories.iter().enumerate() {
            if categories[..index]
                .iter()
                .any(|earlier| earlier.name == category.name)
            {
                return Err(DomainError::validation(format!(
                    "Duplicate category {}",
                    category.name
                )));
            }
            total_weight = total_weight.checked_add(category.weight).ok_or_else(|| {
                DomainError::validation("Total category weight overflows u32")
            })?;
        }

        Ok(Self {
            categories,
            total_weight,
        })
    }

    /// COMMON/RARE/EPIC/LEGENDARY/MYTHIC with weights 50/30/15/4/1.
    pub fn standard() -> Self {
        let categories = [
            ("COMMON", 50, 120, "&7Common"),
            ("RARE", 30, 180, "&9Rare"),
            ("EPIC", 15, 240, "&5Epic"),
            ("LEGENDARY", 4, 300, "&6Legendary"),
            ("MYTHIC", 1, 600, "&dMythic"),
        ]
        .into_iter()
        .map(|(name, weight, duration, tag)| RarityCategory {
            name: name.to_string(),
            weight,
            reward_duration_secs: duration,
            display_tag: tag.to_string(),
        })
        .collect::<Vec<_>>();

        Self {
            categories,
            total_weight: 100,
        }
    }

    /// Categories in declaration order (most common first).
    pub fn categories(&self) -> &[RarityCategory] {
        &self.categories
    }

    /// Categories from rarest to most common.
    pub fn rarest_first(&self) -> impl Iterator<Item = &RarityCategory> {
        self.categories.iter().rev()
    }

    pub fn get(&self, name: &str) -> Option<&RarityCategory> {
        let name = normalize_name(name);
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn total_weight(&self) -> u32 {
        self.total_weight
    }

    /// Map a raw draw in `[0, total_weight)` to its category.
    ///
    /// Returns `None` when the draw is out of range.
    pub fn category_for_draw(&self, draw: u32) -> Option<&RarityCategory> {
        let mut cumulative: u32 = 0;
        for category in &self.categories {
            cumulative += category.weight;
            if draw < cumulative {
                return Some(category);
            }
        }
        None
    }

    /// Weighted pick across all categories.
    ///
    /// `draw(bound)` must return a uniform integer in `[0, bound)`. An
    /// out-of-range draw resolves to the most common category.
    pub fn pick(&self, draw: impl FnOnce(u32) -> u32) -> &RarityCategory {
        let value = draw(self.total_weight);
        match self.category_for_draw(value) {
            Some(category) => category,
            None => &self.categories[0],
        }
    }
}

impl Default for RarityTable {
    fn default() -> Self {
        Self::standard()
    }
}
