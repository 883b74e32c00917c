//! Testability ports for injecting time and randomness.

use chrono::{DateTime, Utc};
use uuid::Uuid;

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait RandomPort: Send + Sync {
    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    fn gen_below(&self, bound: u32) -> u32;
    /// Uniform integer in `[min, max]`.
    fn gen_between(&self, min: u32, max: u32) -> u32;
    /// Uniform value in `[0, 100)`.
    fn gen_percent(&self) -> f64;
    fn gen_uuid(&self) -> Uuid;
}
