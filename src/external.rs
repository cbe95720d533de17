//! External authentication - sign-in delegated to a third-party identity
//! provider
//!
//! The backend exposes three mutations for delegated sign-in:
//! `externalAuthenticationUrl` hands back the provider's authorization URL,
//! `externalObtainAccessTokens` exchanges the provider's callback code for a
//! token pair, and `externalRefresh` exchanges a refresh token for the next
//! pair. Each takes the authentication plugin id and a JSON-encoded `input`
//! string.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AuthError;
use crate::graphql::GraphqlClient;
use crate::refresh::TokenRefresher;
use crate::token::TokenPair;

/// Plugin id of the backend's OpenID Connect authentication plugin
const OPENID_CONNECT_PLUGIN_ID: &str = "holipoly.authentication.openidconnect";

const EXTERNAL_AUTHENTICATION_URL_MUTATION: &str = r"
mutation externalAuthenticationUrl($pluginId: String!, $input: JSONString!) {
  externalAuthenticationUrl(pluginId: $pluginId, input: $input) {
    authenticationData
    errors {
      field
      message
      code
    }
  }
}";

const EXTERNAL_OBTAIN_ACCESS_TOKENS_MUTATION: &str = r"
mutation externalObtainAccessTokens($pluginId: String!, $input: JSONString!) {
  externalObtainAccessTokens(pluginId: $pluginId, input: $input) {
    token
    refreshToken
    csrfToken
    errors {
      field
      message
      code
    }
  }
}";

const EXTERNAL_REFRESH_MUTATION: &str = r"
mutation externalRefresh($pluginId: String!, $input: JSONString!) {
  externalRefresh(pluginId: $pluginId, input: $input) {
    token
    refreshToken
    csrfToken
    errors {
      field
      message
      code
    }
  }
}";

/// Authentication plugin the backend delegates sign-in to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalProvider {
    /// The built-in OpenID Connect plugin
    OpenIdConnect,
    /// Any other authentication plugin, by id
    Custom(String),
}

impl ExternalProvider {
    /// Plugin id string sent with each mutation
    #[must_use]
    pub fn plugin_id(&self) -> &str {
        match self {
            Self::OpenIdConnect => OPENID_CONNECT_PLUGIN_ID,
            Self::Custom(id) => id,
        }
    }
}

/// Tokens issued by a successful code exchange or refresh
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTokens {
    /// Access token
    pub token: String,

    /// Refresh token
    pub refresh_token: String,

    /// CSRF token guarding cookie-based refresh, when the backend issues one
    #[serde(default)]
    pub csrf_token: Option<String>,
}

impl ExternalTokens {
    /// Collapse to the pair the storage handler persists
    #[must_use]
    pub fn into_token_pair(self) -> TokenPair {
        TokenPair::new(self.token, self.refresh_token)
    }
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl OperationError {
    fn render(&self) -> String {
        let mut out = self
            .message
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        if let Some(code) = &self.code {
            out.push_str(&format!(" ({code})"));
        }
        if let Some(field) = &self.field {
            out.push_str(&format!(" [field: {field}]"));
        }
        out
    }
}

fn check_operation_errors(errors: &[OperationError]) -> Result<(), AuthError> {
    match errors.first() {
        Some(error) => Err(AuthError::backend(error.render())),
        None => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiateData {
    external_authentication_url: Option<InitiatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePayload {
    authentication_data: Option<String>,
    #[serde(default)]
    errors: Vec<OperationError>,
}

/// The JSON document nested inside `authenticationData`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticationData {
    authorization_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObtainData {
    external_obtain_access_tokens: Option<TokensPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    external_refresh: Option<TokensPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokensPayload {
    token: Option<String>,
    refresh_token: Option<String>,
    csrf_token: Option<String>,
    #[serde(default)]
    errors: Vec<OperationError>,
}

impl TokensPayload {
    fn into_tokens(self) -> Result<ExternalTokens, AuthError> {
        check_operation_errors(&self.errors)?;

        match (self.token, self.refresh_token) {
            (Some(token), Some(refresh_token)) => Ok(ExternalTokens {
                token,
                refresh_token,
                csrf_token: self.csrf_token,
            }),
            _ => Err(AuthError::invalid_response(
                "token payload missing token or refreshToken",
            )),
        }
    }
}

/// Client for the backend's external-authentication mutations
#[derive(Debug, Clone)]
pub struct ExternalAuth {
    provider: ExternalProvider,
    graphql: GraphqlClient,
}

impl ExternalAuth {
    /// Create a client for the backend at `base_url`, delegating sign-in to
    /// `provider`
    #[must_use]
    pub fn new(base_url: impl Into<String>, provider: ExternalProvider) -> Self {
        Self {
            provider,
            graphql: GraphqlClient::new(base_url),
        }
    }

    /// Backend endpoint this client talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.graphql.endpoint()
    }

    /// The configured authentication plugin
    #[must_use]
    pub fn provider(&self) -> &ExternalProvider {
        &self.provider
    }

    /// Begin delegated sign-in.
    ///
    /// Returns the provider's authorization URL the user must visit;
    /// `redirect_url` is where the provider sends the user back with `code`
    /// and `state` query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a backend-reported error, or a
    /// payload without a usable `authenticationData` document.
    pub async fn initiate(&self, redirect_url: &str) -> Result<String, AuthError> {
        let input = serde_json::json!({ "redirectUri": redirect_url }).to_string();
        let variables = serde_json::json!({
            "pluginId": self.provider.plugin_id(),
            "input": input,
        });

        tracing::debug!(plugin = %self.provider.plugin_id(), "initiating external authentication");

        let data: InitiateData = self
            .graphql
            .run(EXTERNAL_AUTHENTICATION_URL_MUTATION, variables)
            .await?;

        let payload = data.external_authentication_url.ok_or_else(|| {
            AuthError::invalid_response("externalAuthenticationUrl payload missing")
        })?;
        check_operation_errors(&payload.errors)?;

        // authenticationData is itself a JSON document
        let raw = payload
            .authentication_data
            .ok_or_else(|| AuthError::invalid_response("authenticationData missing"))?;
        let parsed: AuthenticationData = serde_json::from_str(&raw).map_err(|err| {
            AuthError::invalid_response(format!("authenticationData is not valid JSON: {err}"))
        })?;

        Ok(parsed.authorization_url)
    }

    /// Exchange the provider callback's authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a backend-reported error, or a
    /// payload missing its tokens.
    pub async fn obtain_access_token(
        &self,
        code: &str,
        state: &str,
    ) -> Result<ExternalTokens, AuthError> {
        let input = serde_json::json!({ "code": code, "state": state }).to_string();
        let variables = serde_json::json!({
            "pluginId": self.provider.plugin_id(),
            "input": input,
        });

        let data: ObtainData = self
            .graphql
            .run(EXTERNAL_OBTAIN_ACCESS_TOKENS_MUTATION, variables)
            .await?;

        data.external_obtain_access_tokens
            .ok_or_else(|| {
                AuthError::invalid_response("externalObtainAccessTokens payload missing")
            })?
            .into_tokens()
    }

    /// Exchange a refresh token for the next token set
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a backend-reported error, or a
    /// payload missing its tokens.
    pub async fn refresh(&self, refresh_token: &str) -> Result<ExternalTokens, AuthError> {
        let input = serde_json::json!({ "refreshToken": refresh_token }).to_string();
        let variables = serde_json::json!({
            "pluginId": self.provider.plugin_id(),
            "input": input,
        });

        let data: RefreshData = self.graphql.run(EXTERNAL_REFRESH_MUTATION, variables).await?;

        data.external_refresh
            .ok_or_else(|| AuthError::invalid_response("externalRefresh payload missing"))?
            .into_tokens()
    }
}

#[async_trait]
impl TokenRefresher for ExternalAuth {
    async fn obtain_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.refresh(refresh_token)
            .await
            .map(ExternalTokens::into_token_pair)
    }
}
