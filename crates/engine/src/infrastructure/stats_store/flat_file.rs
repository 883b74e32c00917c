//! Flat-file stats storage.
//!
//! The whole table lives in memory and is rewritten to a single JSON file on
//! every save. Writes go to a sibling temp file first and are renamed into
//! place, so a crash mid-write leaves the previous file intact.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use treasure_domain::{PlayerStats, UserId};

use crate::infrastructure::ports::{StatsStore, StoreBackend, StoreError};

pub struct FlatFileStatsStore {
    path: PathBuf,
    table: Mutex<HashMap<UserId, PlayerStats>>,
    ready: AtomicBool,
}

impl FlatFileStatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: Mutex::new(HashMap::new()),
            ready: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::NotAvailable)
        }
    }

    async fn read_file(&self) -> Result<HashMap<UserId, PlayerStats>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StoreError::io("read", e)),
        };
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let raw: BTreeMap<String, PlayerStats> =
            serde_json::from_str(&contents).map_err(StoreError::serialization)?;
        let mut table = HashMap::with_capacity(raw.len());
        for (key, stats) in raw {
            match key.parse::<UserId>() {
                Ok(user_id) => {
                    table.insert(user_id, stats);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "Skipping stats entry with invalid user id"),
            }
        }
        Ok(table)
    }

    /// Rewrite the file from `table`. Callers hold the table lock, which
    /// serializes writers.
    async fn write_file(&self, table: &HashMap<UserId, PlayerStats>) -> Result<(), StoreError> {
        let ordered: BTreeMap<String, &PlayerStats> = table
            .iter()
            .map(|(user_id, stats)| (user_id.to_string(), stats))
            .collect();
        let json = serde_json::to_vec_pretty(&ordered).map_err(StoreError::serialization)?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| StoreError::io("write", e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::io("rename", e))
    }
}

#[async_trait]
impl StatsStore for FlatFileStatsStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io("create_dir", e))?;
        }
        let loaded = self.read_file().await?;
        let count = loaded.len();
        *self.table.lock().await = loaded;
        self.ready.store(true, Ordering::Release);
        tracing::info!(path = %self.path.display(), users = count, "Flat-file stats store ready");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.ready.store(false, Ordering::Release);
        Ok(())
    }

    async fn load(&self, user_id: UserId) -> Result<PlayerStats, StoreError> {
        self.ensure_ready()?;
        let table = self.table.lock().await;
        Ok(table.get(&user_id).cloned().unwrap_or_default())
    }

    async fn save(&self, user_id: UserId, stats: &PlayerStats) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let mut table = self.table.lock().await;
        table.insert(user_id, stats.clone());
        self.write_file(&table).await
    }

    async fn load_all(&self) -> Result<HashMap<UserId, PlayerStats>, StoreError> {
        self.ensure_ready()?;
        Ok(self.table.lock().await.clone())
    }

    async fn save_all(&self, stats: &HashMap<UserId, PlayerStats>) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let mut table = self.table.lock().await;
        for (user_id, user_stats) in stats {
            table.insert(*user_id, user_stats.clone());
        }
        self.write_file(&table).await
    }

    fn is_available(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::FlatFile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasure_domain::LuckState;

    #[tokio::test]
    async fn save_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("stats.json");
        let user = UserId::new();
        let mut stats = PlayerStats::new();
        stats.record_found("legendary");
        stats.add_play_time_ms(60_000);
        *stats.luck_mut() = LuckState::from_parts(2.0, 1_000, 1.0, 0);

        let store = FlatFileStatsStore::new(&path);
        store.initialize().await.expect("initialize");
        store.save(user, &stats).await.expect("save");
        store.close().await.expect("close");

        let reopened = FlatFileStatsStore::new(&path);
        reopened.initialize().await.expect("initialize");
        assert_eq!(reopened.load(user).await.expect("load"), stats);
        assert_eq!(reopened.load(UserId::new()).await.expect("load"), PlayerStats::new());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn save_all_merges_into_existing_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FlatFileStatsStore::new(dir.path().join("stats.json"));
        store.initialize().await.expect("initialize");

        let first = UserId::new();
        store.save(first, &PlayerStats::new()).await.expect("save");

        let mut batch = HashMap::new();
        let mut busy = PlayerStats::new();
        busy.record_action();
        batch.insert(UserId::new(), busy);
        store.save_all(&batch).await.expect("save_all");

        let all = store.load_all().await.expect("load_all");
        assert_eq!(all.len(), 2);
        assert!(all.contains_key(&first));
    }

    #[tokio::test]
    async fn corrupt_file_fails_initialize() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stats.json");
        std::fs::write(&path, "{ not json").expect("write");

        let store = FlatFileStatsStore::new(&path);
        assert!(matches!(
            store.initialize().await,
            Err(StoreError::Serialization(_))
        ));
        assert!(!store.is_available());
    }

    #[tokio::test]
    async fn closed_store_rejects_operations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FlatFileStatsStore::new(dir.path().join("stats.json"));
        assert!(matches!(
            store.load(UserId::new()).await,
            Err(StoreError::NotAvailable)
        ));
    }
}
