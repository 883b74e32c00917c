//! Reward entity - a spawned, claimable, time-limited container.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{RewardId, UserId};
use crate::value_objects::{Position, RarityCategory};

/// Lifecycle phase of a spawned reward.
///
/// `Created -> Filled -> (Claimed | Expired)`. `Created -> Expired` is also
/// allowed for a reward whose fill never completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPhase {
    Created,
    Filled,
    Claimed,
    Expired,
}

impl RewardPhase {
    pub fn is_retired(self) -> bool {
        matches!(self, Self::Claimed | Self::Expired)
    }
}

impl std::fmt::Display for RewardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Filled => write!(f, "filled"),
            Self::Claimed => write!(f, "claimed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    id: RewardId,
    finder: UserId,
    position: Position,
    category: String,
    biome: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    phase: RewardPhase,
}

impl Reward {
    pub fn new(
        id: RewardId,
        finder: UserId,
        position: Position,
        category: &RarityCategory,
        biome: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let lifetime = i64::try_from(category.reward_duration_secs())
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let expires_at = now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id,
            finder,
            position,
            category: category.name().to_string(),
            biome: biome.into(),
            created_at: now,
            expires_at,
            phase: RewardPhase::Created,
        }
    }

    pub fn id(&self) -> RewardId {
        self.id
    }

    pub fn finder(&self) -> UserId {
        self.finder
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn biome(&self) -> &str {
        &self.biome
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn phase(&self) -> RewardPhase {
        self.phase
    }

    pub fn is_claimed(&self) -> bool {
        self.phase == RewardPhase::Claimed
    }

    pub fn mark_filled(&mut self) -> Result<(), DomainError> {
        self.transition(RewardPhase::Created, RewardPhase::Filled)
    }

    pub fn claim(&mut self) -> Result<(), DomainError> {
        self.transition(RewardPhase::Filled, RewardPhase::Claimed)
    }

    pub fn expire(&mut self) -> Result<(), DomainError> {
        if self.phase.is_retired() {
            return Err(DomainError::invalid_state_transition(format!(
                "reward {} is already {}",
                self.id, self.phase
            )));
        }
        self.phase = RewardPhase::Expired;
        Ok(())
    }

    fn transition(&mut self, from: RewardPhase, to: RewardPhase) -> Result<(), DomainError> {
        if self.phase != from {
            return Err(DomainError::invalid_state_transition(format!(
                "reward {} cannot move from {} to {}",
                self.id, self.phase, to
            )));
        }
        self.phase = to;
        Ok(())
    }
}
