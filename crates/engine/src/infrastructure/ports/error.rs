//! Error types for infrastructure ports.

/// Persistence failures reported by every [`StatsStore`](super::StatsStore) backend.
///
/// Callers log these and keep the in-memory state authoritative; the next save
/// cycle retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend not initialized, already closed, or unreachable.
    #[error("Stats store is not available")]
    NotAvailable,

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// File system operation failed.
    #[error("I/O error in {operation}: {message}")]
    Io {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create an I/O error with operation context.
    pub fn io(operation: &'static str, message: impl ToString) -> Self {
        Self::Io {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

/// Failures from the world collaborator (container placement and contents).
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorldError {
    #[error("Position {0} is already occupied")]
    Occupied(String),
    #[error("No container at {0}")]
    NoContainer(String),
    #[error("World operation failed: {0}")]
    Failed(String),
}
