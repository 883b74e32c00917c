//! Clock and random implementations.

use crate::infrastructure::ports::{ClockPort, RandomPort};
use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_below(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..bound)
    }

    fn gen_between(&self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }

    fn gen_percent(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..100.0)
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clock that only moves when a test advances it.
#[cfg(test)]
pub struct ManualClock(std::sync::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(start))
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock().expect("clock lock");
        *now += by;
    }
}

#[cfg(test)]
impl ClockPort for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock")
    }
}

/// Fixed random for testing.
///
/// Every percentage roll returns `percent`, every bounded draw returns `draw`
/// (clamped below the bound), and amount ranges resolve to their minimum.
#[cfg(test)]
pub struct FixedRandom {
    pub percent: f64,
    pub draw: u32,
}

#[cfg(test)]
impl FixedRandom {
    pub fn new(percent: f64, draw: u32) -> Self {
        Self { percent, draw }
    }
}

#[cfg(test)]
impl RandomPort for FixedRandom {
    fn gen_below(&self, bound: u32) -> u32 {
        self.draw.min(bound.saturating_sub(1))
    }

    fn gen_between(&self, min: u32, _max: u32) -> u32 {
        min
    }

    fn gen_percent(&self) -> f64 {
        self.percent
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}
