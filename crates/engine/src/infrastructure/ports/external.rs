//! External collaborator ports: the world that hosts reward containers and
//! the item catalogs that turn identifiers into stacks.

use async_trait::async_trait;
use treasure_domain::{Position, Reward};

use super::error::WorldError;

/// A concrete inventory stack produced by an item catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    /// Fully qualified `namespace:key` identifier.
    pub item_id: String,
    pub amount: u32,
    pub display_name: Option<String>,
}

impl ItemStack {
    pub fn new(item_id: impl Into<String>, amount: u32) -> Self {
        Self {
            item_id: item_id.into(),
            amount,
            display_name: None,
        }
    }
}

/// Placement, filling, inspection, and removal of reward containers.
///
/// Implementations marshal calls onto whatever thread owns game state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldPort: Send + Sync {
    async fn place_container(&self, reward: &Reward) -> Result<(), WorldError>;

    /// Replace the container's contents with `slots` (one entry per slot).
    async fn fill_container(
        &self,
        position: &Position,
        slots: Vec<Option<ItemStack>>,
    ) -> Result<(), WorldError>;

    async fn is_container_empty(&self, position: &Position) -> Result<bool, WorldError>;

    async fn remove_container(&self, position: &Position) -> Result<(), WorldError>;
}

/// A third-party (or built-in) item catalog for one identifier namespace.
pub trait ItemCatalogPort: Send + Sync {
    /// Namespace this catalog resolves, e.g. `minecraft`.
    fn namespace(&self) -> &str;

    /// Whether the backing integration is present. Called once at startup.
    fn probe(&self) -> bool;

    /// Build a stack for `key` (the part after `namespace:`).
    fn create_stack(&self, key: &str, amount: u32) -> Option<ItemStack>;
}
