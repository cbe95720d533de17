//! The token pair issued by the backend

use serde::{Deserialize, Serialize};

/// Access token plus the refresh token used to obtain its successor.
///
/// Immutable once constructed; a refresh replaces the stored pair wholesale,
/// never field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Access token sent with API calls
    pub token: String,

    /// Refresh token exchanged for the next pair
    pub refresh_token: String,
}

impl TokenPair {
    /// Create a new token pair
    #[must_use]
    pub fn new(token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Get the `Authorization` header value for API calls
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}
