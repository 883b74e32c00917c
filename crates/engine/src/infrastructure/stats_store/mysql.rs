//! MySQL-backed stats storage with a sized, self-refreshing connection pool.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{MySql, Row};
use treasure_domain::{PlayerStats, UserId};

use super::row::{StatsRow, SELECT_COLUMNS};
use crate::infrastructure::config::MySqlConfig;
use crate::infrastructure::ports::{ClockPort, StatsStore, StoreBackend, StoreError};

/// MySQL implementation of [`StatsStore`].
pub struct MySqlStatsStore {
    pool: MySqlPool,
    clock: Arc<dyn ClockPort>,
    ready: AtomicBool,
}

impl MySqlStatsStore {
    /// Build the pool. Connections are opened lazily, starting with
    /// [`StatsStore::initialize`].
    pub fn new(config: &MySqlConfig, clock: Arc<dyn ClockPort>) -> Result<Self, StoreError> {
        let options = MySqlConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::database("connect", e))?;
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .min_connections(config.min_connections.min(config.max_connections))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs.max(1)))
            .connect_lazy_with(options);
        Ok(Self {
            pool,
            clock,
            ready: AtomicBool::new(false),
        })
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
        E: sqlx::Executor<'e, Database = MySql>,
    {
        sqlx::query(
            r#"
            INSERT INTO player_stats (
                user_id, actions, found_json, play_time_ms, enabled,
                active_multiplier, active_end_ms, queued_multiplier, queued_end_ms, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                actions = VALUES(actions),
                found_json = VALUES(found_json),
                play_time_ms = VALUES(play_time_ms),
                enabled = VALUES(enabled),
                active_multiplier = VALUES(active_multiplier),
                active_end_ms = VALUES(active_end_ms),
                queued_multiplier = VALUES(queued_multiplier),
                queued_end_ms = VALUES(queued_end_ms),
                updated_at = VALUES(updated_at)
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

fn read_row(row: &MySqlRow) -> StatsRow {
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
impl StatsStore for MySqlStatsStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player_stats (
                user_id VARCHAR(36) NOT NULL PRIMARY KEY,
                actions BIGINT NOT NULL DEFAULT 0,
                found_json TEXT NOT NULL,
                play_time_ms BIGINT NOT NULL DEFAULT 0,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                active_multiplier DOUBLE NOT NULL DEFAULT 1.0,
                active_end_ms BIGINT NOT NULL DEFAULT 0,
                queued_multiplier DOUBLE NOT NULL DEFAULT 1.0,
                queued_end_ms BIGINT NOT NULL DEFAULT 0,
                updated_at VARCHAR(40) NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database("initialize", e))?;

        self.ready.store(true, Ordering::Release);
        tracing::info!(
            max_connections = self.pool.options().get_max_connections(),
            "MySQL stats store ready"
        );
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
        StoreBackend::Mysql
    }
}
