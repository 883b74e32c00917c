//! In-memory world adapter.
//!
//! Backs the standalone binary and tests. A host integration replaces it with
//! an adapter that places real containers on the game thread.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use treasure_domain::{Position, Reward, RewardId};

use crate::infrastructure::ports::{ItemStack, WorldError, WorldPort};

#[derive(Debug, Clone)]
struct Container {
    reward_id: RewardId,
    slots: Vec<Option<ItemStack>>,
}

#[derive(Debug, Default)]
pub struct InMemoryWorld {
    containers: DashMap<Position, Container>,
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn reward_at(&self, position: &Position) -> Option<RewardId> {
        self.containers.get(position).map(|c| c.reward_id)
    }

    /// Items currently in the container at `position`.
    pub fn contents(&self, position: &Position) -> Vec<ItemStack> {
        self.containers
            .get(position)
            .map(|c| c.slots.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Slot layout of the container at `position`.
    pub fn slots(&self, position: &Position) -> Option<Vec<Option<ItemStack>>> {
        self.containers.get(position).map(|c| c.slots.clone())
    }

    /// Remove every item, as a user looting the container would.
    pub fn take_all(&self, position: &Position) -> Vec<ItemStack> {
        match self.containers.get_mut(position) {
            Some(mut container) => container.slots.iter_mut().filter_map(Option::take).collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl WorldPort for InMemoryWorld {
    async fn place_container(&self, reward: &Reward) -> Result<(), WorldError> {
        match self.containers.entry(reward.position().clone()) {
            Entry::Occupied(_) => Err(WorldError::Occupied(reward.position().to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Container {
                    reward_id: reward.id(),
                    slots: Vec::new(),
                });
                Ok(())
            }
        }
    }

    async fn fill_container(
        &self,
        position: &Position,
        slots: Vec<Option<ItemStack>>,
    ) -> Result<(), WorldError> {
        let mut container = self
            .containers
            .get_mut(position)
            .ok_or_else(|| WorldError::NoContainer(position.to_string()))?;
        container.slots = slots;
        Ok(())
    }

    async fn is_container_empty(&self, position: &Position) -> Result<bool, WorldError> {
        let container = self
            .containers
            .get(position)
            .ok_or_else(|| WorldError::NoContainer(position.to_string()))?;
        Ok(container.slots.iter().all(Option::is_none))
    }

    async fn remove_container(&self, position: &Position) -> Result<(), WorldError> {
        self.containers
            .remove(position)
            .map(|_| ())
            .ok_or_else(|| WorldError::NoContainer(position.to_string()))
    }
}
