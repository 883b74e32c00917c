//! Luck boost use cases.
//!
//! Timed multipliers that scale a user's spawn chances. Every mutation is
//! persisted in the background.

use std::sync::Arc;

use thiserror::Error;
use treasure_domain::{BoostOutcome, DomainError, LuckPhase, UserId, NEUTRAL_MULTIPLIER};

use crate::infrastructure::ports::{ClockPort, StoreError};
use crate::stores::StatsCache;

#[derive(Debug, Error)]
pub enum LuckError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Stats unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Snapshot of a user's luck for display.
#[derive(Debug, Clone, PartialEq)]
pub struct LuckStatus {
    pub phase: LuckPhase,
    pub multiplier: f64,
    pub remaining_secs: u64,
    pub queued_multiplier: Option<f64>,
    pub queued_remaining_secs: u64,
}

pub struct LuckUseCases {
    stats: Arc<StatsCache>,
    clock: Arc<dyn ClockPort>,
}

impl LuckUseCases {
    pub fn new(stats: Arc<StatsCache>, clock: Arc<dyn ClockPort>) -> Self {
        Self { stats, clock }
    }

    /// Merge a boost of `multiplier` lasting `duration_secs` into the user's state.
    ///
    /// Users without a session are loaded from the store first.
    pub async fn grant_boost(
        &self,
        user_id: UserId,
        duration_secs: u64,
        multiplier: f64,
    ) -> Result<BoostOutcome, LuckError> {
        let now = self.clock.now();
        let outcome = self
            .stats
            .modify(user_id, |stats| stats.luck_mut().grant_boost(now, duration_secs, multiplier))
            .await??;
        tracing::info!(user_id = %user_id, multiplier, duration_secs, outcome = ?outcome, "Luck boost granted");
        self.stats.persist(user_id);
        Ok(outcome)
    }

    /// Multiplier in force right now, promoting a queued boost if due.
    pub fn effective_multiplier(&self, user_id: UserId) -> f64 {
        let now = self.clock.now();
        let Some(stats) = self.stats.snapshot(user_id) else {
            return NEUTRAL_MULTIPLIER;
        };
        if !stats.luck().has_queue() && stats.luck().phase(now) == LuckPhase::Idle {
            return NEUTRAL_MULTIPLIER;
        }
        let Some((multiplier, promoted)) = self.stats.update(user_id, |stats| {
            let promoted = stats.luck_mut().resolve(now);
            (stats.luck_mut().effective_multiplier(now), promoted)
        }) else {
            return NEUTRAL_MULTIPLIER;
        };
        if promoted {
            self.stats.persist(user_id);
        }
        multiplier
    }

    /// Cancel the running boost; a queued boost takes over on next use.
    pub fn remove_boost(&self, user_id: UserId) {
        if self
            .stats
            .update(user_id, |stats| stats.luck_mut().remove_boost())
            .is_none()
        {
            return;
        }
        tracing::info!(user_id = %user_id, "Luck boost removed");
        self.stats.persist(user_id);
    }

    pub fn status(&self, user_id: UserId) -> LuckStatus {
        let now = self.clock.now();
        let mut luck = self
            .stats
            .snapshot(user_id)
            .map(|stats| *stats.luck())
            .unwrap_or_default();
        let multiplier = luck.effective_multiplier(now);
        let queued_multiplier = luck.has_queue().then(|| luck.queued_multiplier());
        LuckStatus {
            phase: luck.phase(now),
            multiplier,
            remaining_secs: millis_to_secs(luck.active_remaining_ms(now)),
            queued_multiplier,
            queued_remaining_secs: millis_to_secs(luck.queued_remaining_ms(now)),
        }
    }
}

fn millis_to_secs(ms: i64) -> u64 {
    u64::try_from(ms.max(0)).unwrap_or(0).div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::ports::{MockClockPort, MockStatsStore, StatsStore};
    use crate::infrastructure::stats_store::FlatFileStatsStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use treasure_domain::PlayerStats;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp")
    }

    fn setup() -> (LuckUseCases, Arc<ManualClock>, Arc<StatsCache>) {
        let mut store = MockStatsStore::new();
        store.expect_save().returning(|_, _| Ok(()));
        let stats = Arc::new(StatsCache::new(Arc::new(store)));
        let clock = Arc::new(ManualClock::new(t0()));
        (LuckUseCases::new(stats.clone(), clock.clone()), clock, stats)
    }

    fn online(stats: &StatsCache) -> UserId {
        let user = UserId::new();
        stats.insert(user, PlayerStats::new(), Some(t0()));
        user
    }

    #[tokio::test]
    async fn stronger_boost_preempts_and_weaker_resumes() {
        let (luck, clock, stats) = setup();
        let user = online(&stats);

        assert_eq!(luck.grant_boost(user, 60, 2.0).await.expect("grant"), BoostOutcome::Started);
        clock.advance(Duration::seconds(20));
        assert_eq!(
            luck.grant_boost(user, 30, 3.0).await.expect("grant"),
            BoostOutcome::Preempted {
                queued_multiplier: 2.0
            }
        );

        let status = luck.status(user);
        assert_eq!(status.phase, LuckPhase::ActiveWithQueued);
        assert_eq!(status.multiplier, 3.0);
        assert_eq!(status.remaining_secs, 30);
        assert_eq!(status.queued_multiplier, Some(2.0));
        assert_eq!(status.queued_remaining_secs, 40);

        clock.advance(Duration::seconds(30));
        assert_eq!(luck.effective_multiplier(user), 2.0);
        clock.advance(Duration::seconds(40));
        assert_eq!(luck.effective_multiplier(user), NEUTRAL_MULTIPLIER);
    }

    #[tokio::test]
    async fn invalid_multiplier_is_rejected() {
        let (luck, _, stats) = setup();
        let user = online(&stats);
        assert!(matches!(
            luck.grant_boost(user, 60, 0.5).await,
            Err(LuckError::Domain(_))
        ));
        assert_eq!(stats.snapshot(user).map(|s| *s.luck()), Some(Default::default()));
    }

    #[tokio::test]
    async fn remove_boost_keeps_queue() {
        let (luck, _, stats) = setup();
        let user = online(&stats);
        luck.grant_boost(user, 60, 3.0).await.expect("grant");
        luck.grant_boost(user, 60, 2.0).await.expect("queue");

        luck.remove_boost(user);

        assert_eq!(luck.effective_multiplier(user), 2.0);
    }

    #[tokio::test]
    async fn unknown_user_is_neutral() {
        let (luck, _, stats) = setup();
        let user = UserId::new();
        assert_eq!(luck.effective_multiplier(user), NEUTRAL_MULTIPLIER);
        assert_eq!(luck.status(user).phase, LuckPhase::Idle);
        luck.remove_boost(user);
        assert!(!stats.contains(user));
    }

    #[tokio::test]
    async fn offline_grant_keeps_stored_counters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FlatFileStatsStore::new(dir.path().join("stats.json")));
        store.initialize().await.expect("initialize");

        let user = UserId::new();
        let mut stored = PlayerStats::new();
        for _ in 0..50 {
            stored.record_action();
        }
        stored.record_found("MYTHIC");
        store.save(user, &stored).await.expect("save");

        let mut clock = MockClockPort::new();
        clock.expect_now().return_const(t0());
        let stats = Arc::new(StatsCache::new(store.clone()));
        let luck = LuckUseCases::new(stats.clone(), Arc::new(clock));

        assert_eq!(luck.grant_boost(user, 60, 2.0).await.expect("grant"), BoostOutcome::Started);

        let after = store.load(user).await.expect("load");
        assert_eq!(after.actions(), 50);
        assert_eq!(after.found("MYTHIC"), 1);
        assert_eq!(after.luck().active_multiplier(), 2.0);
        assert!(!stats.contains(user));
    }

    #[tokio::test]
    async fn offline_grant_fails_when_store_is_down() {
        let mut store = MockStatsStore::new();
        store.expect_is_available().return_const(false);
        store.expect_save().never();
        let stats = Arc::new(StatsCache::new(Arc::new(store)));
        let luck = LuckUseCases::new(stats, Arc::new(ManualClock::new(t0())));

        assert!(matches!(
            luck.grant_boost(UserId::new(), 60, 2.0).await,
            Err(LuckError::Store(StoreError::NotAvailable))
        ));
    }
}
