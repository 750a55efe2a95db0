//! Error types for the Colloquy domain.
//!
//! Uses `thiserror` for ergonomic error definitions. The top-level
//! [`Error`] carries the request-facing taxonomy (authorization, not-found,
//! validation); storage backends report through [`StoreError`] and are
//! translated at the boundary.

use thiserror::Error;

/// The top-level error type for all Colloquy operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request-facing taxonomy ---
    #[error("Unauthorized: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    // --- Storage errors ---
    #[error("Store error: {0}")]
    Store(StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error came from a scope check rather than from storage.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }
}

/// Store failures that mention an unknown identifier surface as `NotFound`;
/// everything else stays a store error and is never shown verbatim to callers.
impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WorkspaceNotFound(name) => Self::NotFound(format!("workspace {name}")),
            StoreError::SessionNotFound(name) => Self::NotFound(format!("session {name}")),
            StoreError::PeerNotFound(name) => Self::NotFound(format!("peer {name}")),
            StoreError::MessageNotFound(id) => Self::NotFound(format!("message {id}")),
            StoreError::InvalidInput(reason) => Self::Validation(reason),
            other => Self::Store(other),
        }
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_becomes_not_found() {
        let err: Error = StoreError::SessionNotFound("s1".into()).into();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("s1"));
    }

    #[test]
    fn backend_failure_stays_store_error() {
        let err: Error = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(err, Error::Store(_)));
        assert!(!err.is_authorization());
    }

    #[test]
    fn invalid_input_becomes_validation() {
        let err: Error = StoreError::InvalidInput("cutoff message in another session".into()).into();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn authorization_error_displays_reason() {
        let err = Error::Authorization("unauthorized workspace".into());
        assert!(err.is_authorization());
        assert_eq!(err.to_string(), "Unauthorized: unauthorized workspace");
    }
}
