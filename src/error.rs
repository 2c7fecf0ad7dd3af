//! Error types for board state materialization.

use thiserror::Error;

/// Result type alias for board state operations.
pub type Result<T> = std::result::Result<T, StateError>;

/// Coarse classification of a [`StateError`].
///
/// Callers that only care about "absent", "corrupt upstream data" or "bug /
/// misuse" can match on this instead of the full error enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Board, thread, content or user is absent from the current index.
    NotFound,
    /// Snapshot data violates the fixed schema or declares mismatched references.
    InvalidRead,
    /// Invariant violation or caller misuse.
    Internal,
}

/// Main error type for board state operations.
#[derive(Error, Debug)]
pub enum StateError {
    /// Requested entity is not indexed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Snapshot structure or content references are corrupt
    #[error("Invalid read: {0}")]
    InvalidRead(String),

    /// Invariant violation or caller misuse
    #[error("Internal error: {0}")]
    Internal(String),

    /// A query was issued against a viewer that holds no state
    #[error("Viewer is not initialized")]
    ViewerNotInitialized,

    /// Pagination start index lies past the end of the index
    #[error("Start index {start} is out of range (length {len})")]
    OutOfRange {
        /// Requested start index.
        start: u64,
        /// Current index length.
        len: u64,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors reported by the snapshot store
    #[error("Store error: {0}")]
    Store(String),
}

impl StateError {
    /// Creates a new not-found error.
    pub fn not_found<T: ToString>(msg: T) -> Self {
        Self::NotFound(msg.to_string())
    }

    /// Creates a new invalid-read error.
    pub fn invalid_read<T: ToString>(msg: T) -> Self {
        Self::InvalidRead(msg.to_string())
    }

    /// Creates a new internal error.
    pub fn internal<T: ToString>(msg: T) -> Self {
        Self::Internal(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new store error.
    pub fn store<T: ToString>(msg: T) -> Self {
        Self::Store(msg.to_string())
    }

    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StateError::NotFound(_)
            | StateError::ViewerNotInitialized
            | StateError::OutOfRange { .. } => ErrorKind::NotFound,
            StateError::InvalidRead(_) | StateError::Serialization(_) => ErrorKind::InvalidRead,
            StateError::Internal(_) | StateError::Store(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(StateError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(StateError::ViewerNotInitialized.kind(), ErrorKind::NotFound);
        assert_eq!(
            StateError::OutOfRange { start: 3, len: 1 }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(StateError::invalid_read("x").kind(), ErrorKind::InvalidRead);
        assert_eq!(StateError::serialization("x").kind(), ErrorKind::InvalidRead);
        assert_eq!(StateError::internal("x").kind(), ErrorKind::Internal);
        assert_eq!(StateError::store("x").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_display() {
        let err = StateError::OutOfRange { start: 5, len: 2 };
        assert_eq!(err.to_string(), "Start index 5 is out of range (length 2)");
        assert_eq!(
            StateError::not_found("thread abc").to_string(),
            "Not found: thread abc"
        );
    }
}
