//! Treasure Engine library.
//!
//! Server-side reward engine: turns qualifying player actions into
//! time-limited reward containers, tracks luck boosts, and persists
//! per-player stats.
//!
//! ## Structure
//!
//! - `stores/` - In-memory runtime state (rules, cached stats, live rewards)
//! - `use_cases/` - User story orchestration across stores and ports
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::{App, AppPorts};
