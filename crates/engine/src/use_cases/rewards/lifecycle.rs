//! Reward lifecycle use case.
//!
//! Orchestrates: action gating, selection, container placement, filling,
//! expiry scheduling, claim detection, and forced expiry at shutdown.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::join_all;
use treasure_domain::{
    fallback_loot, scatter_into_slots, LootDrop, Position, RarityCategory, Reward, RewardId,
    UserId,
};

use super::error::LifecycleError;
use super::select_reward::RewardSelector;
use crate::infrastructure::catalog::CatalogRegistry;
use crate::infrastructure::ports::{ClockPort, ItemStack, RandomPort, WorldPort};
use crate::infrastructure::scheduler::Scheduler;
use crate::stores::{RewardRegistry, RulesStore, StatsCache};

/// Result of reporting a broken container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakOutcome {
    /// Nothing tracked at that position; the host handles the break normally.
    NotTracked,
    /// The container still holds items and must not be destroyed.
    Rejected,
    /// The reward was claimed and stops being tracked.
    Claimed { reward_id: RewardId, category: String },
}

/// Where a reward should appear and who found it.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub finder: UserId,
    pub position: Position,
    pub biome: String,
}

pub struct RewardLifecycle {
    selector: Arc<RewardSelector>,
    rules: Arc<RulesStore>,
    registry: Arc<RewardRegistry>,
    stats: Arc<StatsCache>,
    world: Arc<dyn WorldPort>,
    catalogs: Arc<CatalogRegistry>,
    scheduler: Scheduler,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    container_capacity: usize,
    this: Weak<RewardLifecycle>,
}

impl RewardLifecycle {
    pub fn new(
        selector: Arc<RewardSelector>,
        rules: Arc<RulesStore>,
        registry: Arc<RewardRegistry>,
        stats: Arc<StatsCache>,
        world: Arc<dyn WorldPort>,
        catalogs: Arc<CatalogRegistry>,
        scheduler: Scheduler,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        container_capacity: usize,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            selector,
            rules,
            registry,
            stats,
            world,
            catalogs,
            scheduler,
            clock,
            random,
            container_capacity: container_capacity.max(1),
            this: this.clone(),
        })
    }

    /// Handle one qualifying action by `request.finder` on `source_type`.
    ///
    /// Counts the action, then rolls for a reward unless the user disabled
    /// rewards. Returns the spawned reward's id, if any.
    pub async fn on_action(
        &self,
        source_type: &str,
        request: SpawnRequest,
    ) -> Result<Option<RewardId>, LifecycleError> {
        let now = self.clock.now();
        let counted = self
            .stats
            .modify(request.finder, |stats| {
                stats.record_action();
                if !stats.is_enabled() {
                    return (None, false);
                }
                let promoted = stats.luck_mut().resolve(now);
                (Some(stats.luck_mut().effective_multiplier(now)), promoted)
            })
            .await;
        let (multiplier, promoted) = match counted {
            Ok(counted) => counted,
            Err(e) => {
                tracing::warn!(user_id = %request.finder, error = %e, "Could not record action, skipping reward roll");
                return Ok(None);
            }
        };
        if promoted {
            self.stats.persist(request.finder);
        }
        let Some(multiplier) = multiplier else {
            return Ok(None);
        };

        match self.selector.select(source_type, multiplier) {
            Some(category) => self.spawn(category, request).await,
            None => Ok(None),
        }
    }

    /// Spawn a reward of the named category, skipping selection.
    pub async fn spawn_category(
        &self,
        category_name: &str,
        request: SpawnRequest,
    ) -> Result<Option<RewardId>, LifecycleError> {
        let category = self
            .rules
            .current()
            .rarity
            .get(category_name)
            .cloned()
            .ok_or_else(|| LifecycleError::UnknownCategory(category_name.to_string()))?;
        self.spawn(category, request).await
    }

    /// Create, place, fill, and schedule expiry for a reward.
    ///
    /// Returns `Ok(None)` when a live reward already occupies the position.
    pub async fn spawn(
        &self,
        category: RarityCategory,
        request: SpawnRequest,
    ) -> Result<Option<RewardId>, LifecycleError> {
        let reward = Reward::new(
            RewardId::from_uuid(self.random.gen_uuid()),
            request.finder,
            request.position,
            &category,
            request.biome,
            self.clock.now(),
        );
        let reward_id = reward.id();

        if let Err(rejected) = self.registry.try_track(reward.clone()) {
            tracing::debug!(position = %rejected.position(), "Position already holds a reward");
            return Ok(None);
        }

        if let Err(e) = self.world.place_container(&reward).await {
            self.registry.take(reward_id);
            return Err(e.into());
        }

        let slots = self.roll_contents(&reward);
        if let Err(e) = self.world.fill_container(reward.position(), slots).await {
            self.registry.take(reward_id);
            if let Err(remove) = self.world.remove_container(reward.position()).await {
                tracing::warn!(reward_id = %reward_id, error = %remove, "Failed to remove unfilled container");
            }
            return Err(e.into());
        }
        self.registry.mark_filled(reward_id)?;

        let weak = self.this.clone();
        let handle = self.scheduler.schedule(
            Duration::from_secs(category.reward_duration_secs()),
            move || async move {
                if let Some(lifecycle) = weak.upgrade() {
                    lifecycle.expire(reward_id).await;
                }
            },
        );
        self.registry.set_expiry(reward_id, handle);

        tracing::info!(
            reward_id = %reward_id,
            finder = %reward.finder(),
            category = %category.name(),
            position = %reward.position(),
            "Reward spawned"
        );
        Ok(Some(reward_id))
    }

    /// Roll loot for `reward` and lay it out across the container's slots.
    fn roll_contents(&self, reward: &Reward) -> Vec<Option<ItemStack>> {
        let rules = self.rules.current();
        let drops = rules.loot.roll(
            reward.biome(),
            reward.category(),
            || self.random.gen_percent(),
            |min, max| self.random.gen_between(min, max),
        );
        let mut stacks = self.resolve_stacks(&drops);

        if stacks.is_empty() {
            tracing::debug!(
                reward_id = %reward.id(),
                category = %reward.category(),
                "Loot roll produced nothing, using fallback contents"
            );
            stacks = fallback_loot(reward.category())
                .into_iter()
                .map(|loot| {
                    self.catalogs
                        .resolve(&loot.item_id, loot.amount)
                        .unwrap_or_else(|| ItemStack::new(loot.item_id, loot.amount))
                })
                .collect();
        }

        let (slots, overflow) = scatter_into_slots(stacks, self.container_capacity, |n| {
            let bound = u32::try_from(n).unwrap_or(u32::MAX);
            self.random.gen_below(bound) as usize
        });
        if overflow > 0 {
            tracing::warn!(reward_id = %reward.id(), overflow, "Container full, extra loot dropped");
        }
        slots
    }

    fn resolve_stacks(&self, drops: &[LootDrop]) -> Vec<ItemStack> {
        drops
            .iter()
            .filter_map(|loot| self.catalogs.resolve(&loot.item_id, loot.amount))
            .collect()
    }

    /// Report that `user_id` broke the container at `position`.
    ///
    /// A non-empty container is refused without any state change, so
    /// repeated attempts are harmless.
    pub async fn on_container_break(
        &self,
        user_id: UserId,
        position: &Position,
    ) -> Result<BreakOutcome, LifecycleError> {
        let Some(reward_id) = self.registry.id_at(position) else {
            return Ok(BreakOutcome::NotTracked);
        };
        if !self.world.is_container_empty(position).await? {
            return Ok(BreakOutcome::Rejected);
        }

        // Loses to a concurrent expiry when that took the reward first.
        let Some(mut tracked) = self.registry.take(reward_id) else {
            return Ok(BreakOutcome::NotTracked);
        };
        if let Some(expiry) = &tracked.expiry {
            expiry.cancel();
        }
        if let Err(e) = tracked.reward.claim() {
            tracing::warn!(reward_id = %reward_id, error = %e, "Claimed reward was not filled");
        }

        let category = tracked.reward.category().to_string();
        match self
            .stats
            .modify(user_id, |stats| stats.record_found(&category))
            .await
        {
            Ok(()) => {
                self.stats.persist(user_id);
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Could not record found reward");
            }
        }

        tracing::info!(
            reward_id = %reward_id,
            user_id = %user_id,
            category = %category,
            "Reward claimed"
        );
        Ok(BreakOutcome::Claimed {
            reward_id,
            category,
        })
    }

    /// Retire `reward_id` and remove its container. Returns `false` when the
    /// reward was already claimed or expired.
    pub async fn expire(&self, reward_id: RewardId) -> bool {
        let Some(mut tracked) = self.registry.take(reward_id) else {
            return false;
        };
        if let Some(expiry) = &tracked.expiry {
            expiry.cancel();
        }
        if let Err(e) = tracked.reward.expire() {
            tracing::warn!(reward_id = %reward_id, error = %e, "Unexpected reward state at expiry");
        }
        if let Err(e) = self.world.remove_container(tracked.reward.position()).await {
            tracing::warn!(reward_id = %reward_id, error = %e, "Failed to remove expired container");
        }
        tracing::info!(
            reward_id = %reward_id,
            position = %tracked.reward.position(),
            "Reward expired"
        );
        true
    }

    /// Force-expire every live reward. Returns how many were retired.
    pub async fn shutdown(&self) -> usize {
        let ids = self.registry.ids();
        let expired = join_all(ids.into_iter().map(|id| self.expire(id)))
            .await
            .into_iter()
            .filter(|expired| *expired)
            .count();
        tracing::info!(expired, "Live rewards expired for shutdown");
        expired
    }

    pub fn active_rewards(&self) -> usize {
        self.registry.len()
    }
}
