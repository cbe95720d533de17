//! Token storage handler - durable auth state plus change notification

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::events::{AuthEvent, AuthEventBus};
use crate::storage::{AuthStateStore, StorageError, storage_key};
use crate::token::TokenPair;

/// Persists the current [`TokenPair`] under a key derived from the backend
/// base URL and publishes a notification on every mutation.
///
/// At most one pair is stored per key; writes always replace. Reads fail
/// soft - a missing, unreadable, or malformed entry is simply no session.
pub struct TokenStorageHandler {
    key: String,
    store: Arc<dyn AuthStateStore>,
    bus: AuthEventBus,
}

impl TokenStorageHandler {
    /// Create a handler over `store`, keyed by `base_url`, publishing on the
    /// process-shared bus for that backend
    #[must_use]
    pub fn new(base_url: &str, store: Arc<dyn AuthStateStore>) -> Self {
        let key = storage_key(base_url);
        let bus = AuthEventBus::shared(&key);

        Self { key, store, bus }
    }

    /// Create a handler publishing on an explicitly provided bus instead of
    /// the process-shared one
    #[must_use]
    pub fn with_bus(base_url: &str, store: Arc<dyn AuthStateStore>, bus: AuthEventBus) -> Self {
        Self {
            key: storage_key(base_url),
            store,
            bus,
        }
    }

    /// Storage key / notification channel name for this backend
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// The bus this handler publishes on
    #[must_use]
    pub fn bus(&self) -> &AuthEventBus {
        &self.bus
    }

    /// Attach a listener for sign-in/sign-out notifications. Dropping the
    /// receiver unsubscribes it.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.bus.subscribe()
    }

    /// Read the stored pair, `None` when no usable session exists
    #[must_use]
    pub fn get_auth_state(&self) -> Option<TokenPair> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::debug!(key = %self.key, "auth state read failed: {err}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(pair) => Some(pair),
            Err(err) => {
                tracing::debug!(key = %self.key, "stored auth state is malformed: {err}");
                None
            }
        }
    }

    /// Replace the stored pair, then publish [`AuthEvent::SignedIn`]
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written; nothing is published
    /// in that case.
    pub fn set_auth_state(&self, pair: &TokenPair) -> Result<(), StorageError> {
        let raw = serde_json::to_string(pair)?;
        self.store.put(&self.key, &raw)?;

        self.bus.publish(AuthEvent::SignedIn);
        Ok(())
    }

    /// Remove the stored pair, then publish [`AuthEvent::SignedOut`].
    ///
    /// Clearing an absent session still publishes - subscribers track the
    /// latest state, not transitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be removed; nothing
    /// is published in that case.
    pub fn clear_auth_state(&self) -> Result<(), StorageError> {
        self.store.remove(&self.key)?;

        self.bus.publish(AuthEvent::SignedOut);
        Ok(())
    }
}
