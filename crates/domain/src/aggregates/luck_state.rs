//! LuckState aggregate - one running boost plus at most one queued boost.
//!
//! # Phases
//!
//! | Phase              | Active slot | Queue slot |
//! |--------------------|-------------|------------|
//! | `Idle`             | neutral     | neutral    |
//! | `Active`           | running     | neutral    |
//! | `ActiveWithQueued` | running     | waiting    |
//!
//! Transitions happen only through [`LuckState::grant_boost`] and
//! [`LuckState::resolve`]. `resolve` runs before every read of the effective
//! multiplier, so an expired boost is promoted or cleared lazily.
//!
//! A queue exists iff `queued_multiplier > 1.0`. All end times are absolute
//! epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Multiplier of a user without any boost.
pub const NEUTRAL_MULTIPLIER: f64 = 1.0;

/// Two multipliers closer than this are treated as the same boost strength.
pub const MULTIPLIER_TOLERANCE: f64 = 0.01;

/// Observable phase of a [`LuckState`] at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LuckPhase {
    Idle,
    Active,
    ActiveWithQueued,
}

/// What a call to [`LuckState::grant_boost`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoostOutcome {
    /// No boost was running; the grant became active.
    Started,
    /// Same strength as the running boost; its duration was extended.
    Extended,
    /// Stronger than the running boost, which moved to the queue.
    Preempted { queued_multiplier: f64 },
    /// Weaker than the running boost; installed as the queued boost.
    Queued,
    /// Same strength as the queued boost; its duration was extended.
    QueueExtended,
    /// Weaker than both slots; discarded.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuckState {
    active_multiplier: f64,
    active_end_ms: i64,
    queued_multiplier: f64,
    queued_end_ms: i64,
}

impl LuckState {
    pub fn neutral() -> Self {
        Self {
            active_multiplier: NEUTRAL_MULTIPLIER,
            active_end_ms: 0,
            queued_multiplier: NEUTRAL_MULTIPLIER,
            queued_end_ms: 0,
        }
    }

    /// Rebuild from persisted fields. Multipliers below neutral (or NaN) are
    /// clamped to neutral.
    pub fn from_parts(
        active_multiplier: f64,
        active_end_ms: i64,
        queued_multiplier: f64,
        queued_end_ms: i64,
    ) -> Self {
        Self {
            active_multiplier: sanitize(active_multiplier),
            active_end_ms,
            queued_multiplier: sanitize(queued_multiplier),
            queued_end_ms,
        }
    }

    pub fn active_multiplier(&self) -> f64 {
        self.active_multiplier
    }

    pub fn active_end_ms(&self) -> i64 {
        self.active_end_ms
    }

    pub fn queued_multiplier(&self) -> f64 {
        self.queued_multiplier
    }

    pub fn queued_end_ms(&self) -> i64 {
        self.queued_end_ms
    }

    pub fn has_queue(&self) -> bool {
        self.queued_multiplier > NEUTRAL_MULTIPLIER
    }

    fn has_active(&self, now_ms: i64) -> bool {
        now_ms < self.active_end_ms
    }

    fn clear_active(&mut self) {
        self.active_multiplier = NEUTRAL_MULTIPLIER;
        self.active_end_ms = 0;
    }

    fn clear_queue(&mut self) {
        self.queued_multiplier = NEUTRAL_MULTIPLIER;
        self.queued_end_ms = 0;
    }

    /// Promote the queued boost once the active one has ended, or fall back to
    /// neutral when nothing valid is waiting.
    ///
    /// Returns `true` when a queued boost was promoted. Calling it again at the
    /// same instant leaves the state unchanged.
    pub fn resolve(&mut self, now: DateTime<Utc>) -> bool {
        let now_ms = now.timestamp_millis();
        if self.has_active(now_ms) {
            return false;
        }

        if self.has_queue() && self.queued_end_ms > now_ms {
            self.active_multiplier = self.queued_multiplier;
            self.active_end_ms = now_ms + (self.queued_end_ms - now_ms);
            self.clear_queue();
            return true;
        }

        self.clear_active();
        self.clear_queue();
        false
    }

    /// Merge a new boost of `duration_secs` at `multiplier` into this state.
    pub fn grant_boost(
        &mut self,
        now: DateTime<Utc>,
        duration_secs: u64,
        multiplier: f64,
    ) -> Result<BoostOutcome, DomainError> {
        if !multiplier.is_finite() || multiplier < NEUTRAL_MULTIPLIER {
            return Err(DomainError::validation(format!(
                "Boost multiplier must be at least {NEUTRAL_MULTIPLIER}, got {multiplier}"
            )));
        }
        let duration_ms = i64::try_from(duration_secs)
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .ok_or_else(|| DomainError::validation("Boost duration is too large"))?;

        self.resolve(now);
        let now_ms = now.timestamp_millis();

        if !self.has_active(now_ms) {
            self.active_end_ms = end_after(now_ms, duration_ms)?;
            self.active_multiplier = multiplier;
            return Ok(BoostOutcome::Started);
        }

        if same_strength(multiplier, self.active_multiplier) {
            self.active_end_ms = end_after(self.active_end_ms, duration_ms)?;
            return Ok(BoostOutcome::Extended);
        }

        if multiplier > self.active_multiplier {
            let remaining_ms = self.active_end_ms - now_ms;
            let active_end_ms = end_after(now_ms, duration_ms)?;
            let queued_end_ms = end_after(active_end_ms, remaining_ms)?;
            let interrupted = self.active_multiplier;
            // Any previously queued boost is overwritten.
            self.queued_multiplier = interrupted;
            self.queued_end_ms = queued_end_ms;
            self.active_multiplier = multiplier;
            self.active_end_ms = active_end_ms;
            return Ok(BoostOutcome::Preempted {
                queued_multiplier: interrupted,
            });
        }

        if !self.has_queue()
            || self.queued_multiplier < multiplier
            || self.queued_end_ms <= self.active_end_ms
        {
            self.queued_end_ms = end_after(self.active_end_ms, duration_ms)?;
            self.queued_multiplier = multiplier;
            return Ok(BoostOutcome::Queued);
        }

        if same_strength(multiplier, self.queued_multiplier) {
            self.queued_end_ms = end_after(self.queued_end_ms, duration_ms)?;
            return Ok(BoostOutcome::QueueExtended);
        }

        Ok(BoostOutcome::Dropped)
    }

    /// The multiplier to apply to spawn chances right now.
    pub fn effective_multiplier(&mut self, now: DateTime<Utc>) -> f64 {
        self.resolve(now);
        if self.has_active(now.timestamp_millis()) {
            self.active_multiplier
        } else {
            NEUTRAL_MULTIPLIER
        }
    }

    /// Cancel the running boost. The queued boost, if any, is kept.
    pub fn remove_boost(&mut self) {
        self.clear_active();
    }

    /// Phase at `now`, without promoting anything.
    pub fn phase(&self, now: DateTime<Utc>) -> LuckPhase {
        let now_ms = now.timestamp_millis();
        match (self.has_active(now_ms), self.has_queue()) {
            (false, _) => LuckPhase::Idle,
            (true, false) => LuckPhase::Active,
            (true, true) => LuckPhase::ActiveWithQueued,
        }
    }

    /// Milliseconds left on the running boost.
    pub fn active_remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.active_end_ms - now.timestamp_millis()).max(0)
    }

    /// Milliseconds the queued boost will run once promoted.
    pub fn queued_remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        if !self.has_queue() {
            return 0;
        }
        let starts_at = self.active_end_ms.max(now.timestamp_millis());
        (self.queued_end_ms - starts_at).max(0)
    }
}

impl Default for LuckState {
    fn default() -> Self {
        Self::neutral()
    }
}

fn end_after(start_ms: i64, duration_ms: i64) -> Result<i64, DomainError> {
    start_ms
        .checked_add(duration_ms)
        .ok_or_else(|| DomainError::validation("Boost end time is out of range"))
}

fn same_strength(a: f64, b: f64) -> bool {
    (a - b).abs() < MULTIPLIER_TOLERANCE
}

fn sanitize(multiplier: f64) -> f64 {
    if multiplier.is_finite() && multiplier >= NEUTRAL_MULTIPLIER {
        multiplier
    } else {
        NEUTRAL_MULTIPLIER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid timestamp")
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[test]
    fn new_state_is_idle_and_neutral() {
        let mut luck = LuckState::neutral();
        assert_eq!(luck.phase(t0()), LuckPhase::Idle);
        assert_eq!(luck.effective_multiplier(t0()), 1.0);
        assert!(!luck.has_queue());
    }

    #[test]
    fn grant_without_active_starts_boost() {
        let mut luck = LuckState::neutral();
        let outcome = luck.grant_boost(t0(), 60, 2.0).expect("grant");

        assert_eq!(outcome, BoostOutcome::Started);
        assert_eq!(luck.effective_multiplier(t0()), 2.0);
        assert_eq!(luck.active_remaining_ms(t0()), 60_000);
        assert_eq!(luck.phase(t0()), LuckPhase::Active);
    }

    #[test]
    fn same_multiplier_accumulates_duration() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 60, 2.0).expect("first");
        let outcome = luck.grant_boost(t0(), 30, 2.0).expect("second");

        assert_eq!(outcome, BoostOutcome::Extended);
        assert_eq!(luck.effective_multiplier(t0()), 2.0);
        assert!(luck.active_remaining_ms(t0()) >= 89_000);
        assert_eq!(luck.active_end_ms(), t0().timestamp_millis() + 90_000);
    }

    #[test]
    fn multiplier_within_tolerance_counts_as_same() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 60, 2.0).expect("first");
        let outcome = luck.grant_boost(t0(), 30, 2.005).expect("second");
        assert_eq!(outcome, BoostOutcome::Extended);
        assert_eq!(luck.active_multiplier(), 2.0);
    }

    #[test]
    fn higher_multiplier_preempts_and_queues_interrupted_boost() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 100, 2.0).expect("base");

        let outcome = luck.grant_boost(t0(), 50, 3.0).expect("stronger");
        assert_eq!(
            outcome,
            BoostOutcome::Preempted {
                queued_multiplier: 2.0
            }
        );
        assert_eq!(luck.effective_multiplier(t0()), 3.0);
        assert_eq!(luck.active_remaining_ms(t0()), 50_000);
        assert_eq!(luck.phase(t0()), LuckPhase::ActiveWithQueued);
        assert_eq!(luck.queued_multiplier(), 2.0);

        let after_strong = t0() + secs(50);
        assert_eq!(luck.effective_multiplier(after_strong), 2.0);
        assert!(luck.active_remaining_ms(after_strong) >= 100_000);
        assert!(!luck.has_queue());

        let after_all = t0() + secs(150);
        assert_eq!(luck.effective_multiplier(after_all), 1.0);
        assert_eq!(luck.phase(after_all), LuckPhase::Idle);
    }

    #[test]
    fn preemption_preserves_remaining_time_after_partial_use() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 100, 2.0).expect("base");
        let later = t0() + secs(40);
        luck.grant_boost(later, 10, 4.0).expect("stronger");

        assert_eq!(luck.queued_remaining_ms(later), 60_000);
        let promoted_at = later + secs(10);
        assert!(luck.resolve(promoted_at));
        assert_eq!(luck.active_multiplier(), 2.0);
        assert_eq!(luck.active_remaining_ms(promoted_at), 60_000);
    }

    #[test]
    fn preemption_overwrites_existing_queue() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 100, 3.0).expect("base");
        luck.grant_boost(t0(), 100, 1.5).expect("queued weak");
        assert_eq!(luck.queued_multiplier(), 1.5);

        luck.grant_boost(t0(), 10, 5.0).expect("stronger");
        assert_eq!(luck.queued_multiplier(), 3.0);
    }

    #[test]
    fn lower_multiplier_queues_after_active() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 100, 3.0).expect("base");
        let outcome = luck.grant_boost(t0(), 40, 2.0).expect("weaker");

        assert_eq!(outcome, BoostOutcome::Queued);
        assert_eq!(luck.effective_multiplier(t0()), 3.0);
        assert_eq!(luck.queued_end_ms(), t0().timestamp_millis() + 140_000);
        assert_eq!(luck.queued_remaining_ms(t0()), 40_000);
    }

    #[test]
    fn stronger_weak_grant_replaces_weaker_queue() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 100, 3.0).expect("base");
        luck.grant_boost(t0(), 40, 1.5).expect("weak");
        let outcome = luck.grant_boost(t0(), 20, 2.0).expect("less weak");

        assert_eq!(outcome, BoostOutcome::Queued);
        assert_eq!(luck.queued_multiplier(), 2.0);
        assert_eq!(luck.queued_remaining_ms(t0()), 20_000);
    }

    #[test]
    fn equal_queue_is_extended() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 100, 3.0).expect("base");
        luck.grant_boost(t0(), 40, 2.0).expect("queued");
        let outcome = luck.grant_boost(t0(), 20, 2.0).expect("same as queue");

        assert_eq!(outcome, BoostOutcome::QueueExtended);
        assert_eq!(luck.queued_remaining_ms(t0()), 60_000);
    }

    #[test]
    fn weaker_than_both_slots_is_dropped() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 100, 3.0).expect("base");
        luck.grant_boost(t0(), 40, 2.0).expect("queued");
        let before = luck;
        let outcome = luck.grant_boost(t0(), 500, 1.5).expect("weakest");

        assert_eq!(outcome, BoostOutcome::Dropped);
        assert_eq!(luck, before);
    }

    #[test]
    fn stale_queue_ending_before_active_is_replaced() {
        let mut luck = LuckState::from_parts(
            3.0,
            t0().timestamp_millis() + 100_000,
            2.5,
            t0().timestamp_millis() + 50_000,
        );
        let outcome = luck.grant_boost(t0(), 10, 1.5).expect("weak");
        assert_eq!(outcome, BoostOutcome::Queued);
        assert_eq!(luck.queued_multiplier(), 1.5);
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 10, 3.0).expect("base");
        luck.grant_boost(t0(), 30, 2.0).expect("queued");

        let at = t0() + secs(10);
        let mut once = luck;
        once.resolve(at);
        let mut twice = once;
        twice.resolve(at);
        assert_eq!(once, twice);

        let mut idle = LuckState::neutral();
        idle.resolve(at);
        assert_eq!(idle, LuckState::neutral());
    }

    #[test]
    fn expired_queue_is_not_promoted() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 10, 3.0).expect("base");
        luck.grant_boost(t0(), 10, 2.0).expect("queued");

        let way_later = t0() + secs(60);
        assert!(!luck.resolve(way_later));
        assert_eq!(luck, LuckState::neutral());
    }

    #[test]
    fn remove_boost_keeps_queue() {
        let mut luck = LuckState::neutral();
        luck.grant_boost(t0(), 100, 3.0).expect("base");
        luck.grant_boost(t0(), 50, 2.0).expect("queued");

        luck.remove_boost();
        assert_eq!(luck.active_multiplier(), 1.0);
        assert!(luck.has_queue());
        // Queue is promoted on the next read
        assert_eq!(luck.effective_multiplier(t0()), 2.0);
    }

    #[test]
    fn invalid_grants_are_rejected_without_mutation() {
        let mut luck = LuckState::neutral();
        assert!(luck.grant_boost(t0(), 10, 0.5).is_err());
        assert!(luck.grant_boost(t0(), 10, f64::NAN).is_err());
        assert!(luck.grant_boost(t0(), u64::MAX, 2.0).is_err());
        assert_eq!(luck, LuckState::neutral());
    }

    #[test]
    fn end_time_overflow_is_rejected_without_mutation() {
        let max_secs = u64::try_from(i64::MAX / 1000).expect("fits");

        let mut luck = LuckState::neutral();
        assert!(matches!(
            luck.grant_boost(t0(), max_secs, 2.0),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(luck, LuckState::neutral());

        luck.grant_boost(t0(), 60, 2.0).expect("grant");
        let before = luck;
        for multiplier in [2.0, 3.0, 1.5] {
            assert!(luck.grant_boost(t0(), max_secs, multiplier).is_err());
            assert_eq!(luck, before);
        }
    }

    #[test]
    fn from_parts_clamps_sub_neutral_multipliers() {
        let luck = LuckState::from_parts(0.2, 5, f64::NAN, 7);
        assert_eq!(luck.active_multiplier(), 1.0);
        assert_eq!(luck.queued_multiplier(), 1.0);
        assert_eq!(luck.active_end_ms(), 5);
    }

    #[test]
    fn serde_uses_camel_case_fields() {
        let luck = LuckState::from_parts(2.0, 10, 1.5, 20);
        let json = serde_json::to_value(luck).expect("serialize");
        assert_eq!(json["activeMultiplier"], 2.0);
        assert_eq!(json["queuedEndMs"], 20);
    }
}
