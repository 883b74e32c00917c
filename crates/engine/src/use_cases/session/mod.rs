//! Session use cases.
//!
//! Loads stats when a user joins, accumulates play time, flushes the cache
//! periodically, and persists on quit.

use std::sync::Arc;
use std::time::Duration;

use treasure_domain::{PlayerStats, UserId};

use crate::infrastructure::ports::{ClockPort, StoreError};
use crate::infrastructure::scheduler::{Scheduler, TimerHandle};
use crate::stores::StatsCache;

pub struct SessionUseCases {
    stats: Arc<StatsCache>,
    clock: Arc<dyn ClockPort>,
}

impl SessionUseCases {
    pub fn new(stats: Arc<StatsCache>, clock: Arc<dyn ClockPort>) -> Self {
        Self { stats, clock }
    }

    /// Load and cache the user's stats, starting their session.
    ///
    /// Falls back to fresh stats when the store is unavailable or fails.
    pub async fn join(&self, user_id: UserId) -> PlayerStats {
        let stats = self.stats.open_session(user_id, self.clock.now()).await;
        tracing::debug!(user_id = %user_id, "Session started");
        stats
    }

    /// End the user's session: record play time, persist, and evict.
    pub async fn quit(&self, user_id: UserId) -> Option<PlayerStats> {
        let now = self.clock.now();
        let (stats, saved) = self
            .stats
            .close_session(user_id, |stats, started| {
                if let Some(started) = started {
                    let elapsed = (now - started).num_milliseconds();
                    stats.add_play_time_ms(u64::try_from(elapsed).unwrap_or(0));
                }
            })
            .await?;

        if let Err(e) = saved {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to persist stats on quit");
        }
        tracing::debug!(user_id = %user_id, play_time_ms = stats.play_time_ms(), "Session ended");
        Some(stats)
    }

    pub async fn set_enabled(&self, user_id: UserId, enabled: bool) -> Result<(), StoreError> {
        self.stats.modify(user_id, |stats| stats.set_enabled(enabled)).await?;
        self.stats.persist(user_id);
        Ok(())
    }

    /// Flip reward eligibility, returning the new value.
    pub async fn toggle(&self, user_id: UserId) -> Result<bool, StoreError> {
        let enabled = self
            .stats
            .modify(user_id, |stats| {
                let enabled = !stats.is_enabled();
                stats.set_enabled(enabled);
                enabled
            })
            .await?;
        self.stats.persist(user_id);
        Ok(enabled)
    }

    /// Save every changed cached user in one batch.
    ///
    /// A store that is not available is initialized again first, so a
    /// backend that failed at startup is picked up once it recovers.
    pub async fn flush_all(&self) -> Result<usize, StoreError> {
        let store = self.stats.store();
        if !store.is_available() {
            store.initialize().await?;
            tracing::info!("Stats store recovered");
        }
        let flushed = self.stats.flush().await?;
        if flushed > 0 {
            tracing::debug!(users = flushed, "Player stats flushed");
        }
        Ok(flushed)
    }

    /// Flush every `interval` until the returned handle is cancelled.
    pub fn start_flush_loop(self: &Arc<Self>, scheduler: &Scheduler, interval: Duration) -> TimerHandle {
        let sessions = Arc::clone(self);
        scheduler.schedule_repeating(interval, move || {
            let sessions = Arc::clone(&sessions);
            async move {
                if let Err(e) = sessions.flush_all().await {
                    tracing::warn!(error = %e, "Periodic stats flush failed, retrying next cycle");
                }
            }
        })
    }

    pub fn online_users(&self) -> usize {
        self.stats.len()
    }
}
