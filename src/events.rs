//! Cross-context sign-in/sign-out notifications
//!
//! Every auth-state mutation is broadcast on a channel named after the
//! derived storage key. Subscribers use the notifications to invalidate
//! local caches when some other context signs in or out - the broadcast is
//! the only way they learn about changes they did not trigger themselves.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};
use tokio::sync::broadcast;

/// Default channel capacity. Receivers that lag behind lose the oldest
/// events; only the latest state matters to consumers.
pub const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Auth-state change notification. Carries no payload beyond the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthEvent {
    /// A token pair was stored
    SignedIn,
    /// The stored session was cleared
    SignedOut,
}

/// Broadcast channel distributing [`AuthEvent`]s for one backend.
///
/// Clones publish into the same underlying channel. Delivery is
/// fire-and-forget: there is no acknowledgement, and publishing with no
/// subscribers simply drops the event.
#[derive(Debug, Clone)]
pub struct AuthEventBus {
    name: String,
    sender: broadcast::Sender<AuthEvent>,
}

/// Process-wide senders keyed by channel name. Handlers constructed
/// independently for the same backend land on the same channel, which is
/// what carries a sign-out in one context to every other context.
fn registry() -> &'static Mutex<HashMap<String, broadcast::Sender<AuthEvent>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, broadcast::Sender<AuthEvent>>>> =
        OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

impl AuthEventBus {
    /// Create a standalone bus with the given channel name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_EVENT_CAPACITY)
    }

    /// Create a standalone bus with an explicit capacity
    #[must_use]
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            name: name.into(),
            sender,
        }
    }

    /// Get the process-shared bus for a channel name, creating it on first
    /// use
    #[must_use]
    pub fn shared(name: &str) -> Self {
        let mut buses = registry().lock().unwrap_or_else(PoisonError::into_inner);
        let sender = buses
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(DEFAULT_EVENT_CAPACITY).0)
            .clone();

        Self {
            name: name.to_string(),
            sender,
        }
    }

    /// Channel name (the same string as the storage key)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a listener. Dropping the receiver unsubscribes it.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers, returning how many
    /// received it
    pub fn publish(&self, event: AuthEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::trace!(channel = %self.name, ?event, receivers, "published auth event");
                receivers
            }
            Err(_) => {
                tracing::trace!(channel = %self.name, ?event, "no subscribers for auth event");
                0
            }
        }
    }

    /// Current number of subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
