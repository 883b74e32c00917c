//! Stats persistence backends.
//!
//! - `FlatFileStatsStore` - one JSON file, rewritten on each save
//! - `SqliteStatsStore` - embedded SQL database
//! - `MySqlStatsStore` - networked SQL server behind a connection pool

mod flat_file;
mod mysql;
mod row;
mod sqlite;

use std::sync::Arc;

pub use flat_file::FlatFileStatsStore;
pub use mysql::MySqlStatsStore;
pub use sqlite::SqliteStatsStore;

use crate::infrastructure::config::StorageConfig;
use crate::infrastructure::ports::{ClockPort, StatsStore, StoreBackend, StoreError};

/// Build the configured backend. Nothing is opened until
/// [`StatsStore::initialize`].
pub fn build_stats_store(
    config: &StorageConfig,
    clock: Arc<dyn ClockPort>,
) -> Result<Arc<dyn StatsStore>, StoreError> {
    let store: Arc<dyn StatsStore> = match config.backend {
        StoreBackend::FlatFile => Arc::new(FlatFileStatsStore::new(&config.flat_file_path)),
        StoreBackend::Sqlite => Arc::new(SqliteStatsStore::new(&config.sqlite_path, clock)),
        StoreBackend::Mysql => Arc::new(MySqlStatsStore::new(&config.mysql, clock)?),
    };
    tracing::info!(backend = %config.backend, "Stats store configured");
    Ok(store)
}
