//! # Holipoly Auth SDK for Rust
//!
//! Authentication SDK for Holipoly GraphQL backends: delegated (external)
//! sign-in, durable token storage, de-duplicated token refresh, and
//! cross-context sign-in/sign-out notifications. Async/await, strong typing,
//! tokio-based.
//!
//! ## Quick Start
//!
//! ```no_run
//! use holipoly_auth_sdk::{ExternalProvider, HolipolyAuthClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HolipolyAuthClient::builder("https://demo.holipoly.io/graphql/")
//!         .provider(ExternalProvider::OpenIdConnect)
//!         .build();
//!
//!     // Send the user to the identity provider
//!     let auth_url = client.initiate("https://example.com/auth/callback").await?;
//!     println!("Visit: {auth_url}");
//!
//!     // After the provider redirects back with ?code=...&state=...
//!     let pair = client.sign_in("code-from-callback", "state-from-callback").await?;
//!     println!("Signed in: {}", pair.authorization_header());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Core Features
//!
//! ### 1. Token storage with change notifications
//!
//! The stored token pair lives under a key derived from the backend base
//! URL, so two backend instances sharing one profile never collide. Every
//! mutation publishes a [`AuthEvent`] on a channel with the same derived
//! name - subscribe to invalidate caches when *any* context signs in or out:
//!
//! ```no_run
//! # use holipoly_auth_sdk::{AuthEvent, HolipolyAuthClient};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HolipolyAuthClient::new("https://demo.holipoly.io/graphql/");
//! let mut events = client.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             AuthEvent::SignedIn => println!("session established"),
//!             AuthEvent::SignedOut => println!("session gone, drop caches"),
//!         }
//!     }
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ### 2. De-duplicated refresh
//!
//! [`HolipolyAuthClient::refresh`] never races itself: callers that arrive
//! while a refresh is in flight await the same outcome instead of issuing a
//! second network call. A successful refresh replaces the stored pair and
//! publishes `SignedIn`; a failed one clears it and publishes `SignedOut`,
//! signaling that the session is no longer valid.
//!
//! ### 3. Pluggable storage
//!
//! Token pairs persist through the [`storage::AuthStateStore`] trait -
//! [`storage::FileStore`] (platform config directory, user-only permissions)
//! by default, [`storage::MemoryStore`] for tests and embeddings without
//! durable storage.
//!
//! ## Architecture
//!
//! - [`client`]: [`HolipolyAuthClient`], the entry point
//! - [`external`]: the `externalAuthenticationUrl` /
//!   `externalObtainAccessTokens` / `externalRefresh` mutation wrappers
//! - [`handler`]: [`TokenStorageHandler`] - persisted state plus
//!   notifications
//! - [`refresh`]: [`RefreshCoordinator`] and the injected [`TokenRefresher`]
//! - [`events`]: [`AuthEventBus`], the per-backend broadcast channel
//! - [`storage`]: storage backends and key derivation
//! - [`error`]: error types and handling
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing) for
//! structured logging. Events are always emitted but are zero-cost when no
//! subscriber is attached.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod events;
pub mod external;
mod graphql;
pub mod handler;
pub mod refresh;
pub mod storage;
pub mod token;

// Re-export commonly used types
pub use client::{HolipolyAuthClient, HolipolyAuthClientBuilder};
pub use error::{AuthError, Result};
pub use events::{AuthEvent, AuthEventBus, DEFAULT_EVENT_CAPACITY};
pub use external::{ExternalAuth, ExternalProvider, ExternalTokens};
pub use handler::TokenStorageHandler;
pub use refresh::{RefreshCoordinator, TokenRefresher};
pub use storage::{AuthStateStore, FileStore, MemoryStore, StorageError, storage_key};
pub use token::TokenPair;

/// Version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
