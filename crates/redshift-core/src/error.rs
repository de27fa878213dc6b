use std::time::Duration;

use thiserror::Error;

/// Canonical error type for provider operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity was not found in the engine catalog.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"database"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// The engine could not be reached, or a transaction could not be opened.
    #[error("connection error: {message}")]
    Connection {
        /// Driver-level failure description.
        message: String,
    },

    /// The engine rejected a statement (syntax, permission, conflict).
    #[error("statement failed: {message}")]
    Statement {
        /// Engine error message, reported verbatim.
        message: String,
    },

    /// A freshly created database did not become visible in the catalog in time.
    #[error("database `{name}` not visible in catalog after {waited:?}")]
    PropagationTimeout {
        /// Name the catalog was polled for.
        name: String,
        /// Total time spent polling.
        waited: Duration,
    },

    /// Operation violates current state rules.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Human-readable explanation of the invalid state.
        message: String,
    },

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },

    /// Host state could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Validation error for input data.
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl CoreError {
    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a `Connection` variant.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a `Statement` variant.
    #[must_use]
    pub fn statement(message: impl Into<String>) -> Self {
        Self::Statement {
            message: message.into(),
        }
    }

    /// Creates a `PropagationTimeout` variant.
    #[must_use]
    pub fn propagation_timeout(name: impl Into<String>, waited: Duration) -> Self {
        Self::PropagationTimeout {
            name: name.into(),
            waited,
        }
    }

    /// Creates an `InvalidState` variant.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a `ValidationError` variant.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// Returns true when the error means the entity is definitely absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
