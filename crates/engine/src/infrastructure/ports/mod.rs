//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Stats persistence (flat file, SQLite, MySQL)
//! - The world hosting reward containers
//! - Item catalogs
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

pub use error::{StoreError, WorldError};
pub use external::{ItemCatalogPort, ItemStack, WorldPort};
pub use repos::{StatsStore, StoreBackend};
pub use testing::{ClockPort, RandomPort};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::MockWorldPort;
#[cfg(test)]
pub use repos::MockStatsStore;
#[cfg(test)]
pub use testing::MockClockPort;
