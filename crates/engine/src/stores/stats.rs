//! Cached player stats for users with an active session.
//!
//! The cache is authoritative while a user is online. Writes for one user go
//! through that user's write slot one at a time, and each write saves the
//! stats current when it runs, so an older copy never lands after a newer
//! one. Users without a session are read from the store before they change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use treasure_domain::{PlayerStats, UserId};

use crate::infrastructure::ports::{StatsStore, StoreError};

struct CachedStats {
    stats: PlayerStats,
    session_started: Option<DateTime<Utc>>,
    version: u64,
    /// False while the session runs on defaults because the stored record
    /// could not be loaded.
    durable: bool,
}

/// Highest version written to the store for one user.
type WriteSlot = Arc<Mutex<u64>>;

pub struct StatsCache {
    entries: DashMap<UserId, CachedStats>,
    slots: DashMap<UserId, WriteSlot>,
    versions: AtomicU64,
    flush_lock: Mutex<()>,
    store: Arc<dyn StatsStore>,
}

impl StatsCache {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self {
            entries: DashMap::new(),
            slots: DashMap::new(),
            versions: AtomicU64::new(0),
            flush_lock: Mutex::new(()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn StatsStore> {
        &self.store
    }

    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn slot(&self, user_id: UserId) -> WriteSlot {
        Arc::clone(self.slots.entry(user_id).or_default().value())
    }

    fn apply<R>(&self, entry: &mut CachedStats, f: impl FnOnce(&mut PlayerStats) -> R) -> R {
        let result = f(&mut entry.stats);
        entry.version = self.next_version();
        result
    }

    /// Cache `stats` for `user_id`, starting a session at `session_started`.
    pub fn insert(&self, user_id: UserId, stats: PlayerStats, session_started: Option<DateTime<Utc>>) {
        let version = self.next_version();
        self.entries.insert(
            user_id,
            CachedStats {
                stats,
                session_started,
                version,
                durable: true,
            },
        );
    }

    /// Load the user's stored stats and start their session at `now`.
    ///
    /// Falls back to fresh stats when the store is unavailable or fails. Such
    /// a session is merged into the stored record before it is first written.
    pub async fn open_session(&self, user_id: UserId, now: DateTime<Utc>) -> PlayerStats {
        let slot = self.slot(user_id);
        let _written = slot.lock().await;

        let loaded = if self.store.is_available() {
            self.store.load(user_id).await
        } else {
            Err(StoreError::NotAvailable)
        };
        let (stats, durable) = match loaded {
            Ok(stats) => (stats, true),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to load player stats, using defaults");
                (PlayerStats::new(), false)
            }
        };

        let version = self.next_version();
        self.entries.insert(
            user_id,
            CachedStats {
                stats: stats.clone(),
                session_started: Some(now),
                version,
                durable,
            },
        );
        stats
    }

    /// Mutate the stats of a user with a session. Returns `None` otherwise.
    pub fn update<R>(&self, user_id: UserId, f: impl FnOnce(&mut PlayerStats) -> R) -> Option<R> {
        let mut entry = self.entries.get_mut(&user_id)?;
        Some(self.apply(&mut entry, f))
    }

    /// Mutate any user's stats.
    ///
    /// Cached users change in place and are persisted by the caller or the
    /// next flush. Users without a session are loaded, changed, and saved
    /// before this returns; nothing is written when the load fails.
    pub async fn modify<R>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&mut PlayerStats) -> R,
    ) -> Result<R, StoreError> {
        if let Some(mut entry) = self.entries.get_mut(&user_id) {
            return Ok(self.apply(&mut entry, f));
        }

        let slot = self.slot(user_id);
        let mut written = slot.lock().await;
        // Joined while we waited for the slot.
        if let Some(mut entry) = self.entries.get_mut(&user_id) {
            return Ok(self.apply(&mut entry, f));
        }

        if !self.store.is_available() {
            return Err(StoreError::NotAvailable);
        }
        let mut stats = self.store.load(user_id).await?;
        let result = f(&mut stats);
        let version = self.next_version();
        self.store.save(user_id, &stats).await?;
        *written = version;
        tracing::debug!(user_id = %user_id, "Updated stats of user without a session");
        Ok(result)
    }

    pub fn snapshot(&self, user_id: UserId) -> Option<PlayerStats> {
        self.entries.get(&user_id).map(|entry| entry.stats.clone())
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.entries.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Save the user's current stats without blocking the caller.
    ///
    /// Returns `None` for users without a session. Failures are logged; the
    /// periodic flush retries them.
    pub fn persist(self: &Arc<Self>, user_id: UserId) -> Option<JoinHandle<Result<(), StoreError>>> {
        if !self.contains(user_id) {
            return None;
        }
        let cache = Arc::clone(self);
        Some(tokio::spawn(async move {
            let result = cache.write_current(user_id).await;
            if let Err(e) = &result {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to persist player stats");
            }
            result
        }))
    }

    async fn write_current(&self, user_id: UserId) -> Result<(), StoreError> {
        let slot = self.slot(user_id);
        let mut written = slot.lock().await;
        self.reconcile(user_id).await?;

        let Some((stats, version)) = self
            .entries
            .get(&user_id)
            .map(|entry| (entry.stats.clone(), entry.version))
        else {
            // Evicted; the final state was saved when the session closed.
            return Ok(());
        };
        if version <= *written {
            return Ok(());
        }
        self.store.save(user_id, &stats).await?;
        *written = version;
        Ok(())
    }

    /// Merge a session that started on defaults into the stored record.
    /// The caller holds the user's write slot.
    async fn reconcile(&self, user_id: UserId) -> Result<(), StoreError> {
        let pending = self.entries.get(&user_id).is_some_and(|entry| !entry.durable);
        if !pending {
            return Ok(());
        }
        if !self.store.is_available() {
            return Err(StoreError::NotAvailable);
        }
        let stored = self.store.load(user_id).await?;
        if let Some(mut entry) = self.entries.get_mut(&user_id) {
            let mut merged = stored;
            merged.absorb(&entry.stats);
            entry.stats = merged;
            entry.durable = true;
            entry.version = self.next_version();
            tracing::info!(user_id = %user_id, "Merged session stats into stored record");
        }
        Ok(())
    }

    /// End the user's session: evict them, let `finish` settle the final
    /// stats, and save them.
    ///
    /// Returns `None` when the user had no session, otherwise the final stats
    /// and the outcome of the save.
    pub async fn close_session(
        &self,
        user_id: UserId,
        finish: impl FnOnce(&mut PlayerStats, Option<DateTime<Utc>>),
    ) -> Option<(PlayerStats, Result<(), StoreError>)> {
        let slot = self.slot(user_id);
        let mut written = slot.lock().await;
        let reconciled = self.reconcile(user_id).await;

        let (_, mut entry) = self.entries.remove(&user_id)?;
        finish(&mut entry.stats, entry.session_started);

        let saved = match reconciled {
            // Writing defaults would overwrite the stored record.
            Err(e) => Err(e),
            Ok(()) => {
                let version = self.next_version();
                let saved = self.store.save(user_id, &entry.stats).await;
                if saved.is_ok() {
                    *written = version;
                }
                saved
            }
        };
        Some((entry.stats, saved))
    }

    /// Save every cached user that changed since their last write, in one
    /// batch. Returns how many users were written.
    pub async fn flush(&self) -> Result<usize, StoreError> {
        let _flushing = self.flush_lock.lock().await;

        let users: Vec<UserId> = self.entries.iter().map(|entry| *entry.key()).collect();
        let mut slots = Vec::with_capacity(users.len());
        for user_id in users {
            let written = self.slot(user_id).lock_owned().await;
            slots.push((user_id, written));
        }

        let mut batch = HashMap::new();
        let mut pending = Vec::new();
        for (index, (user_id, written)) in slots.iter().enumerate() {
            if let Err(e) = self.reconcile(*user_id).await {
                tracing::warn!(user_id = %user_id, error = %e, "Leaving unmerged session stats out of flush");
                continue;
            }
            let Some(entry) = self.entries.get(user_id) else {
                continue;
            };
            if entry.version > **written {
                batch.insert(*user_id, entry.stats.clone());
                pending.push((index, entry.version));
            }
        }
        if batch.is_empty() {
            return Ok(0);
        }

        self.store.save_all(&batch).await?;
        for (index, version) in pending {
            *slots[index].1 = version;
        }
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockStatsStore, StoreBackend};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use treasure_domain::LuckState;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp")
    }

    fn veteran() -> PlayerStats {
        let mut found = BTreeMap::new();
        found.insert("MYTHIC".to_string(), 1);
        PlayerStats::restore(50, found, 60_000, true, LuckState::neutral())
    }

    /// In-memory store whose first save stalls.
    #[derive(Default)]
    struct SlowFirstSave {
        saved: std::sync::Mutex<HashMap<UserId, PlayerStats>>,
        saves: AtomicUsize,
    }

    impl SlowFirstSave {
        fn durable(&self, user_id: UserId) -> Option<PlayerStats> {
            self.saved.lock().expect("lock").get(&user_id).cloned()
        }
    }

    #[async_trait]
    impl StatsStore for SlowFirstSave {
        async fn initialize(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn load(&self, user_id: UserId) -> Result<PlayerStats, StoreError> {
            Ok(self.durable(user_id).unwrap_or_default())
        }

        async fn save(&self, user_id: UserId, stats: &PlayerStats) -> Result<(), StoreError> {
            if self.saves.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.saved.lock().expect("lock").insert(user_id, stats.clone());
            Ok(())
        }

        async fn load_all(&self) -> Result<HashMap<UserId, PlayerStats>, StoreError> {
            Ok(self.saved.lock().expect("lock").clone())
        }

        async fn save_all(&self, stats: &HashMap<UserId, PlayerStats>) -> Result<(), StoreError> {
            self.saved.lock().expect("lock").extend(stats.clone());
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn backend(&self) -> StoreBackend {
            StoreBackend::FlatFile
        }
    }

    #[tokio::test]
    async fn update_ignores_users_without_session() {
        let cache = StatsCache::new(Arc::new(MockStatsStore::new()));
        let user = UserId::new();

        assert!(cache.update(user, PlayerStats::record_action).is_none());
        assert!(!cache.contains(user));

        cache.insert(user, PlayerStats::new(), None);
        let actions = cache.update(user, |stats| {
            stats.record_action();
            stats.actions()
        });
        assert_eq!(actions, Some(1));
    }

    #[tokio::test]
    async fn snapshot_is_detached_from_cache() {
        let cache = StatsCache::new(Arc::new(MockStatsStore::new()));
        let user = UserId::new();
        cache.insert(user, PlayerStats::new(), None);

        let copy = cache.snapshot(user).expect("cached");
        cache.update(user, PlayerStats::record_action);

        assert_eq!(copy.actions(), 0);
        assert_eq!(cache.snapshot(user).map(|s| s.actions()), Some(1));
    }

    #[tokio::test]
    async fn persist_saves_current_stats() {
        let user = UserId::new();
        let mut store = MockStatsStore::new();
        store
            .expect_save()
            .withf(move |id, stats| *id == user && stats.actions() == 2)
            .times(1)
            .returning(|_, _| Ok(()));

        let cache = Arc::new(StatsCache::new(Arc::new(store)));
        cache.insert(user, PlayerStats::new(), None);
        cache.update(user, |stats| {
            stats.record_action();
            stats.record_action();
        });

        let handle = cache.persist(user).expect("cached user");
        handle.await.expect("join").expect("save");
        // Nothing changed since the last write.
        cache.persist(user).expect("cached user").await.expect("join").expect("noop");
    }

    #[tokio::test]
    async fn persist_reports_store_failure() {
        let mut store = MockStatsStore::new();
        store
            .expect_save()
            .returning(|_, _| Err(StoreError::NotAvailable));

        let cache = Arc::new(StatsCache::new(Arc::new(store)));
        let user = UserId::new();
        cache.insert(user, PlayerStats::new(), None);

        let result = cache.persist(user).expect("cached user").await.expect("join");
        assert!(matches!(result, Err(StoreError::NotAvailable)));
        assert!(cache.contains(user));
        assert!(cache.persist(UserId::new()).is_none());
    }

    #[tokio::test]
    async fn modify_without_session_builds_on_stored_record() {
        let user = UserId::new();
        let mut store = MockStatsStore::new();
        store.expect_is_available().return_const(true);
        store.expect_load().times(1).returning(|_| Ok(veteran()));
        store
            .expect_save()
            .withf(|_, stats| stats.actions() == 50 && stats.found("MYTHIC") == 1 && !stats.is_enabled())
            .times(1)
            .returning(|_, _| Ok(()));

        let cache = StatsCache::new(Arc::new(store));
        cache
            .modify(user, |stats| stats.set_enabled(false))
            .await
            .expect("modify");

        assert!(!cache.contains(user));
    }

    #[tokio::test]
    async fn modify_without_session_writes_nothing_when_load_fails() {
        let mut store = MockStatsStore::new();
        store.expect_is_available().return_const(true);
        store
            .expect_load()
            .returning(|_| Err(StoreError::database("load", "connection reset")));
        store.expect_save().never();

        let cache = StatsCache::new(Arc::new(store));
        let result = cache.modify(UserId::new(), PlayerStats::record_action).await;

        assert!(matches!(result, Err(StoreError::Database { .. })));
    }

    #[tokio::test]
    async fn session_on_defaults_is_merged_before_flush() {
        let user = UserId::new();
        let mut store = MockStatsStore::new();
        store.expect_is_available().return_const(true);
        let mut seq = mockall::Sequence::new();
        store
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(StoreError::database("load", "timeout")));
        store
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(veteran()));
        store
            .expect_save_all()
            .withf(move |batch| {
                batch
                    .get(&user)
                    .is_some_and(|stats| stats.actions() == 51 && stats.found("MYTHIC") == 1)
            })
            .times(1)
            .returning(|_| Ok(()));

        let cache = StatsCache::new(Arc::new(store));
        assert_eq!(cache.open_session(user, now()).await, PlayerStats::new());
        cache.update(user, PlayerStats::record_action);

        assert_eq!(cache.flush().await.expect("flush"), 1);
        assert_eq!(cache.snapshot(user).map(|s| s.actions()), Some(51));
        // Already written
        assert_eq!(cache.flush().await.expect("flush"), 0);
    }

    #[tokio::test]
    async fn close_session_keeps_unmerged_defaults_off_the_store() {
        let mut store = MockStatsStore::new();
        store.expect_is_available().return_const(true);
        store
            .expect_load()
            .returning(|_| Err(StoreError::database("load", "timeout")));
        store.expect_save().never();

        let cache = StatsCache::new(Arc::new(store));
        let user = UserId::new();
        cache.open_session(user, now()).await;

        let (_, saved) = cache.close_session(user, |_, _| {}).await.expect("session");
        assert!(saved.is_err());
        assert!(!cache.contains(user));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_older_save_never_overwrites_newer_stats() {
        let store = Arc::new(SlowFirstSave::default());
        let cache = Arc::new(StatsCache::new(store.clone()));
        let user = UserId::new();
        cache.insert(user, PlayerStats::new(), None);

        cache.update(user, PlayerStats::record_action);
        let first = cache.persist(user).expect("cached");
        tokio::task::yield_now().await;

        cache.update(user, |stats| stats.record_found("EPIC"));
        let second = cache.persist(user).expect("cached");
        let (final_stats, saved) = cache
            .close_session(user, |stats, _| stats.add_play_time_ms(1_000))
            .await
            .expect("session");
        saved.expect("final save");
        first.await.expect("join").expect("first save");
        second.await.expect("join").expect("second save");

        let durable = store.durable(user).expect("saved");
        assert_eq!(durable.found("EPIC"), 1);
        assert_eq!(durable, final_stats);
    }
}
