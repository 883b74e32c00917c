//! Administrative command use cases: rule reloads, test spawns, and player info.

use std::path::Path;
use std::sync::Arc;

use treasure_domain::{PlayerStats, RewardId, UserId};

use super::luck::{LuckStatus, LuckUseCases};
use super::rewards::{LifecycleError, RewardLifecycle, SpawnRequest};
use crate::infrastructure::config::{AppConfig, ConfigError};
use crate::stores::{RewardRules, RulesStore, StatsCache};

/// Everything `info` reports about one user.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    pub stats: PlayerStats,
    pub luck: LuckStatus,
    pub online: bool,
    pub active_rewards: usize,
}

pub struct AdminUseCases {
    rules: Arc<RulesStore>,
    stats: Arc<StatsCache>,
    lifecycle: Arc<RewardLifecycle>,
    luck: Arc<LuckUseCases>,
}

impl AdminUseCases {
    pub fn new(
        rules: Arc<RulesStore>,
        stats: Arc<StatsCache>,
        lifecycle: Arc<RewardLifecycle>,
        luck: Arc<LuckUseCases>,
    ) -> Self {
        Self {
            rules,
            stats,
            lifecycle,
            luck,
        }
    }

    /// Swap in new rules. Live rewards and luck state are untouched.
    pub fn reload(&self, rules: RewardRules) {
        self.rules.replace(rules);
        tracing::info!("Reward rules reloaded");
    }

    /// Re-read the configuration file and swap in its reward rules.
    pub fn reload_from_file(&self, path: &Path) -> Result<(), ConfigError> {
        let config = AppConfig::load(path)?;
        self.reload(config.rewards.rules());
        Ok(())
    }

    /// Spawn a reward of `category` without rolling for it.
    pub async fn spawn_for_testing(
        &self,
        category: &str,
        request: SpawnRequest,
    ) -> Result<Option<RewardId>, LifecycleError> {
        tracing::info!(finder = %request.finder, category, "Spawning test reward");
        self.lifecycle.spawn_category(category, request).await
    }

    pub fn info(&self, user_id: UserId) -> PlayerInfo {
        let online = self.stats.contains(user_id);
        PlayerInfo {
            stats: self.stats.snapshot(user_id).unwrap_or_default(),
            luck: self.luck.status(user_id),
            online,
            active_rewards: self.lifecycle.active_rewards(),
        }
    }
}
