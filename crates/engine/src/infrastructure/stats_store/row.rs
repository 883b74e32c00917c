//! Column mapping shared by the SQL backends.

use std::collections::BTreeMap;

use treasure_domain::{LuckState, PlayerStats, UserId};

use crate::infrastructure::ports::StoreError;

pub(super) const SELECT_COLUMNS: &str = "user_id, actions, found_json, play_time_ms, enabled, \
     active_multiplier, active_end_ms, queued_multiplier, queued_end_ms";

/// One `player_stats` row in column order.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct StatsRow {
    pub user_id: String,
    pub actions: i64,
    pub found_json: String,
    pub play_time_ms: i64,
    pub enabled: bool,
    pub active_multiplier: f64,
    pub active_end_ms: i64,
    pub queued_multiplier: f64,
    pub queued_end_ms: i64,
}

impl StatsRow {
    pub fn from_stats(user_id: UserId, stats: &PlayerStats) -> Result<Self, StoreError> {
        let found_json = serde_json::to_string(stats.found_by_category())
            .map_err(StoreError::serialization)?;
        let luck = stats.luck();
        Ok(Self {
            user_id: user_id.to_string(),
            actions: clamp_i64(stats.actions()),
            found_json,
            play_time_ms: clamp_i64(stats.play_time_ms()),
            enabled: stats.is_enabled(),
            active_multiplier: luck.active_multiplier(),
            active_end_ms: luck.active_end_ms(),
            queued_multiplier: luck.queued_multiplier(),
            queued_end_ms: luck.queued_end_ms(),
        })
    }

    pub fn into_stats(self) -> Result<(UserId, PlayerStats), StoreError> {
        let user_id: UserId = self
            .user_id
            .parse()
            .map_err(|e| StoreError::serialization(format!("user id '{}': {e}", self.user_id)))?;
        let found: BTreeMap<String, u64> =
            serde_json::from_str(&self.found_json).map_err(StoreError::serialization)?;
        let luck = LuckState::from_parts(
            self.active_multiplier,
            self.active_end_ms,
            self.queued_multiplier,
            self.queued_end_ms,
        );
        let stats = PlayerStats::restore(
            u64::try_from(self.actions).unwrap_or(0),
            found,
            u64::try_from(self.play_time_ms).unwrap_or(0),
            self.enabled,
            luck,
        );
        Ok((user_id, stats))
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
