//! Minimal GraphQL-over-HTTP transport

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::AuthError;

/// Response-body cap for error messages
const SNIPPET_LEN: usize = 256;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Plain POST transport for the backend's GraphQL endpoint
#[derive(Debug, Clone)]
pub(crate) struct GraphqlClient {
    endpoint: String,
    http: reqwest::Client,
}

impl GraphqlClient {
    pub(crate) fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one operation and deserialize its `data` payload.
    ///
    /// The `errors` array is checked before `data` is touched.
    pub(crate) async fn run<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, AuthError> {
        let body = serde_json::json!({ "query": query, "variables": variables });

        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let text = response.text().await?;

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|err| {
            AuthError::invalid_response(format!(
                "failed to parse GraphQL response: {err} - response: {}",
                snippet(&text)
            ))
        })?;

        if let Some(error) = envelope.errors.first() {
            return Err(AuthError::backend(error.message.clone()));
        }

        envelope
            .data
            .ok_or_else(|| AuthError::invalid_response("GraphQL response carried no data"))
    }
}

/// Truncate a response body at a UTF-8 boundary for error messages
fn snippet(text: &str) -> &str {
    if text.len() <= SNIPPET_LEN {
        return text;
    }

    let mut end = SNIPPET_LEN;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}
