//! Scoped storage contracts, adapters, and envelope helpers.

pub mod envelope;
pub mod scoped;

use thiserror::Error;

/// Errors surfaced by scoped store round-trips and typed helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds no value in the requested scope.
    #[error("key `{key}` not found")]
    NotFound {
        /// Key that was looked up.
        key: String,
    },
    /// Store keys must be non-empty.
    #[error("storage key must not be empty")]
    InvalidKey,
    /// Workspace ids must be non-empty printable strings.
    #[error("invalid workspace id `{0}`")]
    InvalidWorkspaceId(String),
    /// A typed value could not be converted to JSON.
    #[error("failed to serialize value for `{key}`: {message}")]
    Serialize {
        /// Key the value was destined for.
        key: String,
        /// Serializer message.
        message: String,
    },
    /// A stored JSON value did not match the requested type.
    #[error("failed to deserialize value for `{key}`: {message}")]
    Deserialize {
        /// Key the value was read from.
        key: String,
        /// Deserializer message.
        message: String,
    },
    /// The backend rejected the operation.
    #[error("backend rejected {operation} for `{key}`: {message}")]
    Backend {
        /// Operation name (`update_value`, `remove_value`, ...).
        operation: &'static str,
        /// Key the operation targeted.
        key: String,
        /// Backend message.
        message: String,
    },
}

pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        Err(StoreError::InvalidKey)
    } else {
        Ok(())
    }
}
