//! Integration tests for refresh coordination: de-duplication of concurrent
//! attempts and the sign-out side effects of failure

use async_trait::async_trait;
use futures::future::join_all;
use holipoly_auth_sdk::refresh::{RefreshCoordinator, TokenRefresher};
use holipoly_auth_sdk::{AuthError, AuthEvent, MemoryStore, TokenPair, TokenStorageHandler};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::TryRecvError;

enum Outcome {
    Succeed(TokenPair),
    FailBackend,
    FailInvalidResponse,
}

/// Counts network calls and holds each attempt open long enough for
/// concurrent callers to attach to it
struct CountingRefresher {
    calls: AtomicU32,
    outcome: Outcome,
}

impl CountingRefresher {
    fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            outcome,
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    async fn obtain_token(&self, _refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;

        match &self.outcome {
            Outcome::Succeed(pair) => Ok(pair.clone()),
            Outcome::FailBackend => Err(AuthError::backend("refresh token expired")),
            Outcome::FailInvalidResponse => Err(AuthError::invalid_response("truncated body")),
        }
    }
}

/// Handler with a stored session, plus a coordinator over `refresher`
fn seeded(
    base_url: &str,
    refresher: Arc<CountingRefresher>,
) -> (Arc<TokenStorageHandler>, RefreshCoordinator) {
    let handler = Arc::new(TokenStorageHandler::new(
        base_url,
        Arc::new(MemoryStore::new()),
    ));
    handler
        .set_auth_state(&TokenPair::new("old-token", "old-refresh"))
        .unwrap();

    let coordinator = RefreshCoordinator::new(refresher, Arc::clone(&handler));
    (handler, coordinator)
}

// ============================================================================
// De-duplication - overlapping callers share one attempt
// ============================================================================

#[tokio::test]
async fn test_concurrent_refreshes_share_one_network_call() {
    let refresher = CountingRefresher::new(Outcome::Succeed(TokenPair::new("t1", "r1")));
    let (_handler, coordinator) = seeded(
        "https://dedup.holipoly.io/graphql/",
        Arc::clone(&refresher),
    );

    let start = Instant::now();
    let outcomes = join_all((0..5).map(|_| coordinator.refresh())).await;
    let elapsed = start.elapsed();

    for outcome in outcomes {
        assert_eq!(outcome.unwrap(), TokenPair::new("t1", "r1"));
    }
    assert_eq!(refresher.calls(), 1);

    // Five serialized attempts would take >= 125ms; attached callers do not
    assert!(
        elapsed < Duration::from_millis(100),
        "callers did not share the in-flight attempt (took {elapsed:?})"
    );
}

#[tokio::test]
async fn test_sequential_refreshes_start_fresh_attempts() {
    let refresher = CountingRefresher::new(Outcome::Succeed(TokenPair::new("t1", "r1")));
    let (_handler, coordinator) = seeded(
        "https://sequential.holipoly.io/graphql/",
        Arc::clone(&refresher),
    );

    coordinator.refresh().await.unwrap();
    assert!(!coordinator.is_refreshing());

    coordinator.refresh().await.unwrap();
    assert_eq!(refresher.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_failure_is_the_identical_failure() {
    let refresher = CountingRefresher::new(Outcome::FailBackend);
    let (_handler, coordinator) = seeded(
        "https://shared-failure.holipoly.io/graphql/",
        Arc::clone(&refresher),
    );

    let outcomes = join_all((0..3).map(|_| coordinator.refresh())).await;
    assert_eq!(refresher.calls(), 1);

    let causes: Vec<_> = outcomes
        .into_iter()
        .map(|outcome| match outcome.unwrap_err() {
            AuthError::Refresh(cause) => cause,
            other => panic!("expected AuthError::Refresh, got {other:?}"),
        })
        .collect();

    assert!(matches!(*causes[0], AuthError::Backend(_)));
    for cause in &causes[1..] {
        assert!(Arc::ptr_eq(&causes[0], cause));
    }
}

// ============================================================================
// Side effects - storage and notifications
// ============================================================================

#[tokio::test]
async fn test_refresh_success_persists_and_notifies_once() {
    let refresher = CountingRefresher::new(Outcome::Succeed(TokenPair::new("t1", "r1")));
    let (handler, coordinator) = seeded(
        "https://success.holipoly.io/graphql/",
        Arc::clone(&refresher),
    );
    let mut events = handler.subscribe();

    let pair = coordinator.refresh().await.unwrap();

    assert_eq!(pair, TokenPair::new("t1", "r1"));
    assert_eq!(handler.get_auth_state(), Some(pair));
    assert_eq!(events.try_recv().unwrap(), AuthEvent::SignedIn);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_refresh_failure_clears_state_and_notifies_sign_out() {
    let refresher = CountingRefresher::new(Outcome::FailBackend);
    let (handler, coordinator) = seeded(
        "https://failure.holipoly.io/graphql/",
        Arc::clone(&refresher),
    );
    let mut events = handler.subscribe();

    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(
        err,
        AuthError::Refresh(cause) if matches!(*cause, AuthError::Backend(_))
    ));
    assert!(handler.get_auth_state().is_none());
    assert_eq!(events.try_recv().unwrap(), AuthEvent::SignedOut);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_malformed_response_leaves_state_untouched() {
    let refresher = CountingRefresher::new(Outcome::FailInvalidResponse);
    let (handler, coordinator) = seeded(
        "https://malformed.holipoly.io/graphql/",
        Arc::clone(&refresher),
    );
    let mut events = handler.subscribe();

    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(
        err,
        AuthError::Refresh(cause) if matches!(*cause, AuthError::InvalidResponse(_))
    ));
    assert_eq!(
        handler.get_auth_state(),
        Some(TokenPair::new("old-token", "old-refresh"))
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_refresh_without_session_makes_no_network_call() {
    let refresher = CountingRefresher::new(Outcome::Succeed(TokenPair::new("t1", "r1")));
    let handler = Arc::new(TokenStorageHandler::new(
        "https://no-session.holipoly.io/graphql/",
        Arc::new(MemoryStore::new()),
    ));
    let coordinator = RefreshCoordinator::new(refresher.clone(), Arc::clone(&handler));
    let mut events = handler.subscribe();

    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(
        err,
        AuthError::Refresh(cause) if matches!(*cause, AuthError::NoSession)
    ));
    assert_eq!(refresher.calls(), 0);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}
