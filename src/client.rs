//! `HolipolyAuthClient` - the SDK entry point
//!
//! One client per backend. The client wires the external-auth mutation
//! wrappers, the token storage handler, and the refresh coordinator together
//! behind the handful of operations consumers are expected to call.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::AuthError;
use crate::events::{AuthEvent, AuthEventBus};
use crate::external::{ExternalAuth, ExternalProvider};
use crate::handler::TokenStorageHandler;
use crate::refresh::{RefreshCoordinator, TokenRefresher};
use crate::storage::{AuthStateStore, FileStore, StorageError};
use crate::token::TokenPair;

/// Builder for [`HolipolyAuthClient`]
pub struct HolipolyAuthClientBuilder {
    base_url: String,
    provider: ExternalProvider,
    store: Option<Arc<dyn AuthStateStore>>,
    bus: Option<AuthEventBus>,
}

impl HolipolyAuthClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            provider: ExternalProvider::OpenIdConnect,
            store: None,
            bus: None,
        }
    }

    /// Delegate sign-in to a specific authentication plugin
    /// (default: OpenID Connect)
    #[must_use]
    pub fn provider(mut self, provider: ExternalProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Use a custom storage backend (default: [`FileStore`] under the
    /// platform config directory)
    #[must_use]
    pub fn store(mut self, store: Arc<dyn AuthStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Publish notifications on an explicit bus instead of the
    /// process-shared one for this backend
    #[must_use]
    pub fn bus(mut self, bus: AuthEventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Build the client
    #[must_use]
    pub fn build(self) -> HolipolyAuthClient {
        let store: Arc<dyn AuthStateStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FileStore::new()),
        };

        let handler = Arc::new(match self.bus {
            Some(bus) => TokenStorageHandler::with_bus(&self.base_url, store, bus),
            None => TokenStorageHandler::new(&self.base_url, store),
        });

        let external = Arc::new(ExternalAuth::new(self.base_url, self.provider));
        let refresher: Arc<dyn TokenRefresher> = external.clone();
        let coordinator = RefreshCoordinator::new(refresher, Arc::clone(&handler));

        HolipolyAuthClient {
            handler,
            external,
            coordinator,
        }
    }
}

/// Client for Holipoly external authentication.
///
/// Reads and writes of the stored session delegate to the
/// [`TokenStorageHandler`]; [`refresh`](Self::refresh) goes through the
/// [`RefreshCoordinator`] so overlapping callers share one network call.
pub struct HolipolyAuthClient {
    handler: Arc<TokenStorageHandler>,
    external: Arc<ExternalAuth>,
    coordinator: RefreshCoordinator,
}

impl HolipolyAuthClient {
    /// Create a client with default configuration for `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder(base_url).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> HolipolyAuthClientBuilder {
        HolipolyAuthClientBuilder::new(base_url)
    }

    /// The external-auth mutation client
    #[must_use]
    pub fn external(&self) -> &ExternalAuth {
        &self.external
    }

    /// The token storage handler
    #[must_use]
    pub fn handler(&self) -> &TokenStorageHandler {
        &self.handler
    }

    /// Begin delegated sign-in; returns the provider's authorization URL
    ///
    /// # Errors
    ///
    /// Propagates [`ExternalAuth::initiate`] failures.
    pub async fn initiate(&self, redirect_url: &str) -> Result<String, AuthError> {
        self.external.initiate(redirect_url).await
    }

    /// Complete delegated sign-in: exchange the callback's `code` and
    /// `state` for tokens, persist the pair, publish
    /// [`AuthEvent::SignedIn`]
    ///
    /// # Errors
    ///
    /// Returns the exchange failure, or a storage error if the pair could
    /// not be persisted (nothing is published then).
    pub async fn sign_in(&self, code: &str, state: &str) -> Result<TokenPair, AuthError> {
        let tokens = self.external.obtain_access_token(code, state).await?;
        let pair = tokens.into_token_pair();
        self.handler.set_auth_state(&pair)?;

        Ok(pair)
    }

    /// Get the current pair, refreshing once if none is stored
    ///
    /// # Errors
    ///
    /// Propagates the coordinated refresh failure.
    pub async fn acquire_token(&self) -> Result<TokenPair, AuthError> {
        if let Some(pair) = self.handler.get_auth_state() {
            tracing::debug!("using stored token pair");
            return Ok(pair);
        }

        self.refresh().await
    }

    /// Refresh the stored session, de-duplicated across concurrent callers
    ///
    /// # Errors
    ///
    /// See [`RefreshCoordinator::refresh`].
    pub async fn refresh(&self) -> Result<TokenPair, AuthError> {
        self.coordinator.refresh().await
    }

    /// Read the stored pair, `None` when no usable session exists
    #[must_use]
    pub fn get_auth_state(&self) -> Option<TokenPair> {
        self.handler.get_auth_state()
    }

    /// Replace the stored pair, publishing [`AuthEvent::SignedIn`]
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn set_auth_state(&self, pair: &TokenPair) -> Result<(), StorageError> {
        self.handler.set_auth_state(pair)
    }

    /// Clear the stored pair, publishing [`AuthEvent::SignedOut`]
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be removed.
    pub fn clear_auth_state(&self) -> Result<(), StorageError> {
        self.handler.clear_auth_state()
    }

    /// Sign out: clear the stored session and notify every context
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be removed.
    pub fn sign_out(&self) -> Result<(), StorageError> {
        self.handler.clear_auth_state()
    }

    /// Whether a pair is currently stored
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.handler.get_auth_state().is_some()
    }

    /// Subscribe to sign-in/sign-out notifications. Dropping the receiver
    /// unsubscribes it.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.handler.subscribe()
    }
}
