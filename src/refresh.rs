//! Refresh coordination - one in-flight attempt shared by all callers

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::AuthError;
use crate::handler::TokenStorageHandler;
use crate::token::TokenPair;

/// The injected network call: exchange a refresh token for a new pair.
///
/// [`ExternalAuth`](crate::external::ExternalAuth) implements this against
/// the backend's `externalRefresh` mutation; tests substitute their own.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Obtain a fresh token pair for `refresh_token`
    async fn obtain_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
}

type SharedAttempt = Shared<BoxFuture<'static, Result<TokenPair, Arc<AuthError>>>>;

/// De-duplicates concurrent refresh attempts.
///
/// `Idle -> Refreshing -> Idle`: callers arriving while an attempt is in
/// flight await the same shared outcome instead of issuing a second network
/// call. The marker clears when the attempt resolves, so the next call
/// starts fresh. There is no cancellation - an in-flight attempt always runs
/// to completion.
pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    handler: Arc<TokenStorageHandler>,
    in_flight: Arc<Mutex<Option<SharedAttempt>>>,
}

impl RefreshCoordinator {
    /// Create a coordinator refreshing through `refresher` and persisting
    /// through `handler`
    #[must_use]
    pub fn new(refresher: Arc<dyn TokenRefresher>, handler: Arc<TokenStorageHandler>) -> Self {
        Self {
            refresher,
            handler,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Refresh the stored session.
    ///
    /// On success the new pair is persisted (publishing `SignedIn`). A
    /// network or backend failure clears the stored state (publishing
    /// `SignedOut`) - the session is no longer valid and callers should
    /// treat the error as sign-out. A malformed response is returned without
    /// touching storage.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Refresh`] wrapping the underlying failure; every
    /// caller attached to the same attempt receives the identical one.
    pub async fn refresh(&self) -> Result<TokenPair, AuthError> {
        let attempt = {
            let mut slot = lock(&self.in_flight);
            if let Some(pending) = slot.as_ref() {
                tracing::debug!("refresh already in flight, attaching to it");
                pending.clone()
            } else {
                let attempt = Self::start(
                    Arc::clone(&self.refresher),
                    Arc::clone(&self.handler),
                    Arc::clone(&self.in_flight),
                );
                *slot = Some(attempt.clone());
                attempt
            }
        };

        attempt.await.map_err(AuthError::Refresh)
    }

    /// Whether a refresh attempt is currently in flight
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    /// Build the shared attempt. The marker resets at resolution, before any
    /// caller observes the outcome - the slot cannot have been replaced
    /// until then, since new attempts start only while it is empty.
    fn start(
        refresher: Arc<dyn TokenRefresher>,
        handler: Arc<TokenStorageHandler>,
        slot: Arc<Mutex<Option<SharedAttempt>>>,
    ) -> SharedAttempt {
        async move {
            let outcome = Self::run(refresher, handler).await;
            *lock(&slot) = None;
            outcome
        }
        .boxed()
        .shared()
    }

    async fn run(
        refresher: Arc<dyn TokenRefresher>,
        handler: Arc<TokenStorageHandler>,
    ) -> Result<TokenPair, Arc<AuthError>> {
        let current = handler
            .get_auth_state()
            .ok_or_else(|| Arc::new(AuthError::NoSession))?;

        match refresher.obtain_token(&current.refresh_token).await {
            Ok(pair) => {
                handler
                    .set_auth_state(&pair)
                    .map_err(|err| Arc::new(AuthError::from(err)))?;
                tracing::debug!("token refresh succeeded");
                Ok(pair)
            }
            Err(err) => {
                if err.signs_out() {
                    tracing::warn!("token refresh failed, clearing stored session: {err}");
                    if let Err(clear_err) = handler.clear_auth_state() {
                        tracing::warn!(
                            "could not clear auth state after failed refresh: {clear_err}"
                        );
                    }
                } else {
                    tracing::warn!("token refresh returned an unusable response: {err}");
                }
                Err(Arc::new(err))
            }
        }
    }
}

fn lock(slot: &Mutex<Option<SharedAttempt>>) -> MutexGuard<'_, Option<SharedAttempt>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
