//! Error types for the Holipoly auth SDK

use std::sync::Arc;
use thiserror::Error;

use crate::storage::StorageError;

/// Main error type for SDK operations
#[derive(Error, Debug)]
pub enum AuthError {
    /// Network failure while talking to the backend
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend reported the operation failed (GraphQL error or
    /// mutation-level error entry)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Response from the backend had an unexpected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Token storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Refresh was requested but no session is stored
    #[error("No stored session - sign in before refreshing")]
    NoSession,

    /// A coordinated token refresh failed. Every caller attached to the same
    /// in-flight attempt receives the identical underlying failure.
    #[error("Token refresh failed: {0}")]
    Refresh(Arc<AuthError>),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether this failure invalidates the stored session.
    ///
    /// Network and backend-reported failures mean the refresh token is no
    /// longer usable; a malformed response or a storage failure says nothing
    /// about the session itself, so storage is left untouched.
    pub(crate) fn signs_out(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Backend(_))
    }
}
