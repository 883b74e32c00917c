//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    catalog::CatalogRegistry,
    ports::{ClockPort, RandomPort, StatsStore, WorldPort},
    scheduler::Scheduler,
};
use crate::stores::{RewardRegistry, RewardRules, RulesStore, StatsCache};
use crate::use_cases;

/// Main application state.
///
/// Holds the runtime stores and every use case, wired to the injected ports.
pub struct App {
    pub stores: Stores,
    pub use_cases: UseCases,
    pub stats_store: Arc<dyn StatsStore>,
    pub scheduler: Scheduler,
}

/// Container for runtime state.
pub struct Stores {
    pub rules: Arc<RulesStore>,
    pub stats: Arc<StatsCache>,
    pub rewards: Arc<RewardRegistry>,
}

/// Container for all use cases.
pub struct UseCases {
    pub rewards: use_cases::RewardUseCases,
    pub luck: Arc<use_cases::LuckUseCases>,
    pub session: Arc<use_cases::SessionUseCases>,
    pub admin: use_cases::AdminUseCases,
}

/// Collaborators the application is built from.
pub struct AppPorts {
    pub stats_store: Arc<dyn StatsStore>,
    pub world: Arc<dyn WorldPort>,
    pub catalogs: Arc<CatalogRegistry>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
}

impl App {
    pub fn new(ports: AppPorts, rules: RewardRules, container_capacity: usize) -> Self {
        let AppPorts {
            stats_store,
            world,
            catalogs,
            clock,
            random,
        } = ports;
        let scheduler = Scheduler::new();

        let stores = Stores {
            rules: Arc::new(RulesStore::new(rules)),
            stats: Arc::new(StatsCache::new(stats_store.clone())),
            rewards: Arc::new(RewardRegistry::new()),
        };

        let selector = Arc::new(use_cases::RewardSelector::new(
            stores.rules.clone(),
            random.clone(),
        ));
        let lifecycle = use_cases::RewardLifecycle::new(
            selector.clone(),
            stores.rules.clone(),
            stores.rewards.clone(),
            stores.stats.clone(),
            world,
            catalogs,
            scheduler.clone(),
            clock.clone(),
            random,
            container_capacity,
        );
        let luck = Arc::new(use_cases::LuckUseCases::new(stores.stats.clone(), clock.clone()));
        let session = Arc::new(use_cases::SessionUseCases::new(stores.stats.clone(), clock));
        let admin = use_cases::AdminUseCases::new(
            stores.rules.clone(),
            stores.stats.clone(),
            lifecycle.clone(),
            luck.clone(),
        );

        let use_cases = UseCases {
            rewards: use_cases::RewardUseCases::new(selector, lifecycle),
            luck,
            session,
            admin,
        };

        Self {
            stores,
            use_cases,
            stats_store,
            scheduler,
        }
    }

    /// Expire live rewards, flush stats, and close the store, in that order.
    pub async fn shutdown(&self) {
        self.use_cases.rewards.lifecycle.shutdown().await;
        self.scheduler.shutdown();
        match self.use_cases.session.flush_all().await {
            Ok(users) => tracing::info!(users, "Final stats flush complete"),
            Err(e) => tracing::warn!(error = %e, "Final stats flush failed"),
        }
        if let Err(e) = self.stats_store.close().await {
            tracing::warn!(error = %e, "Failed to close stats store");
        }
    }
}
