//! SQLite-backed stats storage.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use treasure_domain::{PlayerStats, UserId};

use super::row::{StatsRow, SELECT_COLUMNS};
use crate::infrastructure::ports::{ClockPort, StatsStore, StoreBackend, StoreError};

/// SQLite implementation of [`StatsStore`].
pub struct SqliteStatsStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
    ready: AtomicBool,
}

impl SqliteStatsStore {
    /// Create the store. No connection is opened until [`StatsStore::initialize`].
    pub fn new(db_path: &Path, clock: Arc<dyn ClockPort>) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_lazy_with(options);
        Self {
            pool,
            clock,
            ready: AtomicBool::new(false),
        }
    }

    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::NotAvailable)
        }
    }

    async fn upsert<'e, E>(executor: E, row: &StatsRow, updated_at: &str) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO player_stats (
                user_id, actions, found_json, play_time_ms, enabled,
                active_multiplier, active_end_ms, queued_multiplier, queued_end_ms, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                actions = excluded.actions,
                found_json = excluded.found_json,
                play_time_ms = excluded.play_time_ms,
                enabled = excluded.enabled,
                active_multiplier = excluded.active_multiplier,
                active_end_ms = excluded.active_end_ms,
                queued_multiplier = excluded.queued_multiplier,
                queued_end_ms = excluded.queued_end_ms,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&row.user_id)
        .bind(row.actions)
        .bind(&row.found_json)
        .bind(row.play_time_ms)
        .bind(row.enabled)
        .bind(row.active_multiplier)
        .bind(row.active_end_ms)
        .bind(row.queued_multiplier)
        .bind(row.queued_end_ms)
        .bind(updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

fn read_row(row: &SqliteRow) -> StatsRow {
    StatsRow {
        user_id: row.get("user_id"),
        actions: row.get("actions"),
        found_json: row.get("found_json"),
        play_time_ms: row.get("play_time_ms"),
        enabled: row.get("enabled"),
        active_multiplier: row.get("active_multiplier"),
        active_end_ms: row.get("active_end_ms"),
        queued_multiplier: row.get("queued_multiplier"),
        queued_end_ms: row.get("queued_end_ms"),
    }
}

#[async_trait]
impl StatsStore for SqliteStatsStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player_stats (
                user_id TEXT PRIMARY KEY,
                actions INTEGER NOT NULL DEFAULT 0,
                found_json TEXT NOT NULL DEFAULT '{}',
                play_time_ms INTEGER NOT NULL DEFAULT 0,
                enabled BOOLEAN NOT NULL DEFAULT 1,
                active_multiplier REAL NOT NULL DEFAULT 1.0,
                active_end_ms INTEGER NOT NULL DEFAULT 0,
                queued_multiplier REAL NOT NULL DEFAULT 1.0,
                queued_end_ms INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database("initialize", e))?;

        self.ready.store(true, Ordering::Release);
        tracing::info!("SQLite stats store ready");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.ready.store(false, Ordering::Release);
        self.pool.close().await;
        Ok(())
    }

    async fn load(&self, user_id: UserId) -> Result<PlayerStats, StoreError> {
        self.ensure_ready()?;
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM player_stats WHERE user_id = ?"
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::database("load", e))?;

        match row {
            Some(row) => Ok(read_row(&row).into_stats()?.1),
            None => Ok(PlayerStats::new()),
        }
    }

    async fn save(&self, user_id: UserId, stats: &PlayerStats) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let row = StatsRow::from_stats(user_id, stats)?;
        let updated_at = self.clock.now().to_rfc3339();
        Self::upsert(&self.pool, &row, &updated_at)
            .await
            .map_err(|e| StoreError::database("save", e))
    }

    async fn load_all(&self) -> Result<HashMap<UserId, PlayerStats>, StoreError> {
        self.ensure_ready()?;
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM player_stats"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database("load_all", e))?;

        let mut all = HashMap::with_capacity(rows.len());
        for row in &rows {
            match read_row(row).into_stats() {
                Ok((user_id, stats)) => {
                    all.insert(user_id, stats);
                }
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable stats row"),
            }
        }
        Ok(all)
    }

    async fn save_all(&self, stats: &HashMap<UserId, PlayerStats>) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let rows = stats
            .iter()
            .map(|(user_id, stats)| StatsRow::from_stats(*user_id, stats))
            .collect::<Result<Vec<_>, _>>()?;
        let updated_at = self.clock.now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::database("save_all", e))?;
        for row in &rows {
            if let Err(e) = Self::upsert(&mut *tx, row, &updated_at).await {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                return Err(StoreError::database("save_all", e));
            }
        }
        tx.commit()
            .await
            .map_err(|e| StoreError::database("save_all", e))
    }

    fn is_available(&self) -> bool {
        self.ready.load(Ordering::Acquire) && !self.pool.is_closed()
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }
}
