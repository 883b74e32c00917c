//! Unified error types for the domain layer
//!
//! Configuration parsing reports one error per offending entry so callers can
//! skip it and keep loading the rest.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A rarity category name that is not declared in the rarity table
    #[error("Unknown rarity category: {0}")]
    UnknownCategory(String),

    /// A source type that cannot be used as a spawn policy key
    #[error("Invalid source type: {0}")]
    InvalidSourceType(String),

    /// A loot entry that cannot produce items
    #[error("Malformed loot entry '{item_id}': {reason}")]
    MalformedLoot { item_id: String, reason: String },

    /// State transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    ///
    /// Use this when domain invariants or constraints are violated:
    /// - Required fields are empty or missing
    /// - Values are outside allowed ranges
    ///
    /// # Example
    /// ```ignore
    /// if weight == 0 {
    ///     return Err(DomainError::validation("Category weight must be positive"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unknown_category(name: impl Into<String>) -> Self {
        Self::UnknownCategory(name.into())
    }

    pub fn invalid_source_type(name: impl Into<String>) -> Self {
        Self::InvalidSourceType(name.into())
    }

    /// Create a malformed loot entry error
    pub fn malformed_loot(item_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedLoot {
            item_id: item_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid state transition error
    pub fn invalid_state_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }
}
