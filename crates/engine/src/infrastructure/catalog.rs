//! Item catalogs and the registry that resolves `namespace:key` identifiers.
//!
//! Each catalog is probed once at startup. A namespace whose integration is
//! missing resolves to nothing, and the fill step falls back to built-in loot.

use std::collections::HashMap;
use std::sync::Arc;

use crate::infrastructure::ports::{ItemCatalogPort, ItemStack};

/// Namespace assumed for identifiers without one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Result of probing one catalog integration.
#[derive(Clone)]
pub enum CatalogCapability {
    Available(Arc<dyn ItemCatalogPort>),
    Unavailable,
}

impl CatalogCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl std::fmt::Debug for CatalogCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(catalog) => write!(f, "Available({})", catalog.namespace()),
            Self::Unavailable => write!(f, "Unavailable"),
        }
    }
}

#[derive(Debug, Default)]
pub struct CatalogRegistry {
    capabilities: HashMap<String, CatalogCapability>,
}

impl CatalogRegistry {
    /// Probe every catalog and remember the outcome.
    pub fn probe(catalogs: Vec<Arc<dyn ItemCatalogPort>>) -> Self {
        let mut capabilities = HashMap::new();
        for catalog in catalogs {
            let namespace = catalog.namespace().to_ascii_lowercase();
            let capability = if catalog.probe() {
                tracing::info!(namespace = %namespace, "Item catalog available");
                CatalogCapability::Available(catalog)
            } else {
                tracing::warn!(namespace = %namespace, "Item catalog unavailable, its items will be skipped");
                CatalogCapability::Unavailable
            };
            capabilities.insert(namespace, capability);
        }
        Self { capabilities }
    }

    /// Registry with only the built-in vanilla catalog.
    pub fn vanilla() -> Self {
        Self::probe(vec![Arc::new(VanillaCatalog)])
    }

    pub fn capability(&self, namespace: &str) -> Option<&CatalogCapability> {
        self.capabilities.get(&namespace.to_ascii_lowercase())
    }

    /// Turn `item_id` into a stack, or `None` when its catalog is missing or
    /// does not know the item.
    pub fn resolve(&self, item_id: &str, amount: u32) -> Option<ItemStack> {
        let (namespace, key) = split_item_id(item_id);
        match self.capability(namespace) {
            Some(CatalogCapability::Available(catalog)) => {
                let stack = catalog.create_stack(key, amount);
                if stack.is_none() {
                    tracing::debug!(item_id, "Catalog does not know item");
                }
                stack
            }
            Some(CatalogCapability::Unavailable) => None,
            None => {
                tracing::debug!(item_id, namespace, "No catalog registered for namespace");
                None
            }
        }
    }
}

fn split_item_id(item_id: &str) -> (&str, &str) {
    match item_id.split_once(':') {
        Some((namespace, key)) => (namespace, key),
        None => (DEFAULT_NAMESPACE, item_id),
    }
}

/// Built-in catalog for vanilla identifiers.
#[derive(Debug, Default)]
pub struct VanillaCatalog;

impl ItemCatalogPort for VanillaCatalog {
    fn namespace(&self) -> &str {
        DEFAULT_NAMESPACE
    }

    fn probe(&self) -> bool {
        true
    }

    fn create_stack(&self, key: &str, amount: u32) -> Option<ItemStack> {
        let key = key.trim().to_ascii_lowercase();
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/'));
        if !valid || amount == 0 {
            return None;
        }
        Some(ItemStack::new(format!("{DEFAULT_NAMESPACE}:{key}"), amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MissingPlugin;

    impl ItemCatalogPort for MissingPlugin {
        fn namespace(&self) -> &str {
            "oraxen"
        }

        fn probe(&self) -> bool {
            false
        }

        fn create_stack(&self, key: &str, amount: u32) -> Option<ItemStack> {
            Some(ItemStack::new(format!("oraxen:{key}"), amount))
        }
    }

    #[test]
    fn vanilla_items_resolve_with_or_without_namespace() {
        let registry = CatalogRegistry::vanilla();
        assert_eq!(
            registry.resolve("minecraft:Diamond", 3),
            Some(ItemStack::new("minecraft:diamond", 3))
        );
        assert_eq!(
            registry.resolve("emerald", 1),
            Some(ItemStack::new("minecraft:emerald", 1))
        );
        assert_eq!(registry.resolve("minecraft:not an item", 1), None);
    }

    #[test]
    fn unavailable_catalog_yields_nothing() {
        let registry = CatalogRegistry::probe(vec![Arc::new(VanillaCatalog), Arc::new(MissingPlugin)]);

        assert!(!registry.capability("ORAXEN").map(CatalogCapability::is_available).unwrap_or(true));
        assert_eq!(registry.resolve("oraxen:ruby_sword", 1), None);
        assert_eq!(registry.resolve("itemsadder:thing", 1), None);
    }
}
