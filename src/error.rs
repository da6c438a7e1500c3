//! Errors surfaced by the index layer.

use crate::interfaces::StorageError;

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while building keys, maintaining the folder tree,
/// generating composite records or composing search criteria.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A required identifier or value was missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported move {source_kind} to {target_kind}")]
    UnsupportedMove {
        source_kind: String,
        target_kind: String,
    },

    /// A path or record that must already exist does not.
    #[error("{0} does not exist")]
    NotFound(String),

    #[error("folder is not empty")]
    FolderNotEmpty,

    /// Stored data violates a structural invariant (e.g. a parent-pointer cycle).
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Unexpected value type {value_type} for attribute '{key}'")]
    SchemaTypeMismatch { key: String, value_type: String },

    #[error("Invalid pagination token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IndexError {
    pub fn invalid(message: impl Into<String>) -> Self {
        IndexError::InvalidArgument(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        IndexError::NotFound(what.into())
    }
}
