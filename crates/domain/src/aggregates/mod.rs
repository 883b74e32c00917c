//! Aggregate roots - domain objects that own their related data
//!
//! Each aggregate:
//! - Exposes behavior through methods, not public fields
//! - Returns outcome enums from mutations instead of emitting side effects
//! - Never performs I/O; time and randomness are passed in by the caller

pub mod luck_state;
pub mod player_stats;

pub use luck_state::{BoostOutcome, LuckPhase, LuckState, MULTIPLIER_TOLERANCE, NEUTRAL_MULTIPLIER};
pub use player_stats::PlayerStats;
