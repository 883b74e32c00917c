//! Registry of live rewards.
//!
//! A reward is tracked from placement until it is claimed or expires.
//! [`RewardRegistry::take`] hands each reward out exactly once, which is
//! what keeps claim and expiry mutually exclusive.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use treasure_domain::{DomainError, Position, Reward, RewardId};

use crate::infrastructure::scheduler::TimerHandle;

#[derive(Debug)]
pub struct TrackedReward {
    pub reward: Reward,
    pub expiry: Option<TimerHandle>,
}

#[derive(Default)]
pub struct RewardRegistry {
    rewards: DashMap<RewardId, TrackedReward>,
    positions: DashMap<Position, RewardId>,
}

impl RewardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `reward`'s position and start tracking it.
    ///
    /// Hands the reward back when another live reward already occupies the
    /// position.
    pub fn try_track(&self, reward: Reward) -> Result<(), Reward> {
        match self.positions.entry(reward.position().clone()) {
            Entry::Occupied(_) => Err(reward),
            Entry::Vacant(slot) => {
                slot.insert(reward.id());
                self.rewards.insert(
                    reward.id(),
                    TrackedReward {
                        reward,
                        expiry: None,
                    },
                );
                Ok(())
            }
        }
    }

    /// Attach the expiry timer. Cancels it right away if the reward is
    /// already gone.
    pub fn set_expiry(&self, id: RewardId, handle: TimerHandle) {
        match self.rewards.get_mut(&id) {
            Some(mut tracked) => tracked.expiry = Some(handle),
            None => handle.cancel(),
        }
    }

    pub fn mark_filled(&self, id: RewardId) -> Result<(), DomainError> {
        match self.rewards.get_mut(&id) {
            Some(mut tracked) => tracked.reward.mark_filled(),
            None => Err(DomainError::invalid_state_transition(format!(
                "reward {id} is no longer tracked"
            ))),
        }
    }

    pub fn id_at(&self, position: &Position) -> Option<RewardId> {
        self.positions.get(position).map(|id| *id)
    }

    pub fn get(&self, id: RewardId) -> Option<Reward> {
        self.rewards.get(&id).map(|tracked| tracked.reward.clone())
    }

    /// Stop tracking `id`. Returns `Some` to exactly one caller.
    pub fn take(&self, id: RewardId) -> Option<TrackedReward> {
        let (_, tracked) = self.rewards.remove(&id)?;
        self.positions
            .remove_if(tracked.reward.position(), |_, owner| *owner == id);
        Some(tracked)
    }

    pub fn ids(&self) -> Vec<RewardId> {
        self.rewards.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}
