//! Persistence port for player stats.

use std::collections::HashMap;

use async_trait::async_trait;
use treasure_domain::{PlayerStats, UserId};

use super::error::StoreError;

/// Which backend sits behind a [`StatsStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[serde(alias = "flat_file", alias = "file")]
    FlatFile,
    Sqlite,
    Mysql,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FlatFile => write!(f, "flatfile"),
            Self::Sqlite => write!(f, "sqlite"),
            Self::Mysql => write!(f, "mysql"),
        }
    }
}

/// Durable storage of one [`PlayerStats`] row per user.
///
/// Every backend produces identical logical results for identical input.
/// Failures come back through the `Result`; callers log them and never block
/// gameplay on persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Open connections / files and create the schema if missing.
    async fn initialize(&self) -> Result<(), StoreError>;

    async fn close(&self) -> Result<(), StoreError>;

    /// Stats for `user_id`; fresh defaults when the user has no row yet.
    async fn load(&self, user_id: UserId) -> Result<PlayerStats, StoreError>;

    /// Upsert one row.
    async fn save(&self, user_id: UserId, stats: &PlayerStats) -> Result<(), StoreError>;

    async fn load_all(&self) -> Result<HashMap<UserId, PlayerStats>, StoreError>;

    /// Upsert many rows. SQL backends apply all rows or none.
    async fn save_all(&self, stats: &HashMap<UserId, PlayerStats>) -> Result<(), StoreError>;

    fn is_available(&self) -> bool;

    fn backend(&self) -> StoreBackend;
}
