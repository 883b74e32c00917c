//! PlayerStats aggregate - the per-user persisted record.
//!
//! Counters only ever increase. The record is created on a user's first
//! session and is overwritten, never deleted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregates::luck_state::LuckState;
use crate::value_objects::normalize_name;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    actions: u64,
    found: BTreeMap<String, u64>,
    play_time_ms: u64,
    enabled: bool,
    luck: LuckState,
}

impl PlayerStats {
    /// Fresh stats for a first-time user: zero counters, rewards enabled,
    /// neutral luck.
    pub fn new() -> Self {
        Self {
            actions: 0,
            found: BTreeMap::new(),
            play_time_ms: 0,
            enabled: true,
            luck: LuckState::neutral(),
        }
    }

    /// Rebuild from persisted fields.
    pub fn restore(
        actions: u64,
        found: BTreeMap<String, u64>,
        play_time_ms: u64,
        enabled: bool,
        luck: LuckState,
    ) -> Self {
        let found = found
            .into_iter()
            .map(|(category, count)| (normalize_name(&category), count))
            .collect();
        Self {
            actions,
            found,
            play_time_ms,
            enabled,
            luck,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn actions(&self) -> u64 {
        self.actions
    }

    pub fn found(&self, category: &str) -> u64 {
        self.found
            .get(&normalize_name(category))
            .copied()
            .unwrap_or(0)
    }

    /// All per-category counters, keyed by upper-case category name.
    pub fn found_by_category(&self) -> &BTreeMap<String, u64> {
        &self.found
    }

    pub fn total_found(&self) -> u64 {
        self.found.values().sum()
    }

    pub fn play_time_ms(&self) -> u64 {
        self.play_time_ms
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn luck(&self) -> &LuckState {
        &self.luck
    }

    pub fn luck_mut(&mut self) -> &mut LuckState {
        &mut self.luck
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn record_action(&mut self) {
        self.actions = self.actions.saturating_add(1);
    }

    pub fn record_found(&mut self, category: &str) {
        let counter = self.found.entry(normalize_name(category)).or_insert(0);
        *counter = counter.saturating_add(1);
    }

    pub fn add_play_time_ms(&mut self, elapsed_ms: u64) {
        self.play_time_ms = self.play_time_ms.saturating_add(elapsed_ms);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Fold `unsaved`, which was accumulated on top of fresh defaults, into
    /// this stored record.
    ///
    /// Counters add up. A disabled flag or a non-neutral luck state in
    /// `unsaved` replaces the stored one.
    pub fn absorb(&mut self, unsaved: &PlayerStats) {
        self.actions = self.actions.saturating_add(unsaved.actions);
        for (category, count) in &unsaved.found {
            let counter = self.found.entry(category.clone()).or_insert(0);
            *counter = counter.saturating_add(*count);
        }
        self.play_time_ms = self.play_time_ms.saturating_add(unsaved.play_time_ms);
        if !unsaved.enabled {
            self.enabled = false;
        }
        if unsaved.luck != LuckState::neutral() {
            self.luck = unsaved.luck;
        }
    }
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stats_are_enabled_and_empty() {
        let stats = PlayerStats::new();
        assert!(stats.is_enabled());
        assert_eq!(stats.actions(), 0);
        assert_eq!(stats.total_found(), 0);
        assert_eq!(*stats.luck(), LuckState::neutral());
    }

    #[test]
    fn counters_accumulate_per_category() {
        let mut stats = PlayerStats::new();
        stats.record_action();
        stats.record_action();
        stats.record_found("rare");
        stats.record_found("RARE");
        stats.record_found("Mythic");
        stats.add_play_time_ms(1_500);

        assert_eq!(stats.actions(), 2);
        assert_eq!(stats.found("RARE"), 2);
        assert_eq!(stats.found("mythic"), 1);
        assert_eq!(stats.found("COMMON"), 0);
        assert_eq!(stats.total_found(), 3);
        assert_eq!(stats.play_time_ms(), 1_500);
    }

    #[test]
    fn restore_normalizes_category_keys() {
        let mut found = BTreeMap::new();
        found.insert("epic".to_string(), 4);
        let stats = PlayerStats::restore(10, found, 99, false, LuckState::neutral());

        assert_eq!(stats.found("EPIC"), 4);
        assert!(!stats.is_enabled());
        assert_eq!(stats.found_by_category().keys().next().map(String::as_str), Some("EPIC"));
    }

    #[test]
    fn absorb_adds_counters_onto_stored_record() {
        let mut found = BTreeMap::new();
        found.insert("MYTHIC".to_string(), 1);
        let mut stored = PlayerStats::restore(50, found, 10_000, true, LuckState::neutral());

        let mut unsaved = PlayerStats::new();
        unsaved.record_action();
        unsaved.record_found("MYTHIC");
        unsaved.record_found("RARE");
        unsaved.add_play_time_ms(500);
        stored.absorb(&unsaved);

        assert_eq!(stored.actions(), 51);
        assert_eq!(stored.found("MYTHIC"), 2);
        assert_eq!(stored.found("RARE"), 1);
        assert_eq!(stored.play_time_ms(), 10_500);
        assert!(stored.is_enabled());
        assert_eq!(*stored.luck(), LuckState::neutral());
    }

    #[test]
    fn absorb_keeps_session_flag_and_luck_changes() {
        let mut stored = PlayerStats::new();
        let mut unsaved = PlayerStats::new();
        unsaved.set_enabled(false);
        *unsaved.luck_mut() = LuckState::from_parts(2.0, 1_000, 1.0, 0);

        stored.absorb(&unsaved);

        assert!(!stored.is_enabled());
        assert_eq!(stored.luck().active_multiplier(), 2.0);
    }

    #[test]
    fn json_round_trip_preserves_every_field() {
        let mut stats = PlayerStats::new();
        stats.record_action();
        stats.record_found("LEGENDARY");
        stats.set_enabled(false);
        *stats.luck_mut() = LuckState::from_parts(2.5, 1_000, 1.5, 2_000);

        let json = serde_json::to_string(&stats).expect("serialize");
        let back: PlayerStats = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, stats);
    }
}
