//! Integration tests for the token storage handler: round-trips, exactly one
//! notification per mutation, and cross-context delivery
//!
//! "Contexts" are modeled the way embeddings produce them: independent
//! handlers built over the same backing store, for the same backend URL.

use holipoly_auth_sdk::{AuthEvent, MemoryStore, TokenPair, TokenStorageHandler};
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;

fn handler(base_url: &str) -> TokenStorageHandler {
    TokenStorageHandler::new(base_url, Arc::new(MemoryStore::new()))
}

// ============================================================================
// Round-trip properties
// ============================================================================

#[test]
fn test_set_then_get_returns_the_exact_pair() {
    let handler = handler("https://roundtrip.holipoly.io/graphql/");
    let pair = TokenPair::new("t1", "r1");

    handler.set_auth_state(&pair).unwrap();
    assert_eq!(handler.get_auth_state(), Some(pair));
}

#[test]
fn test_clear_then_get_returns_none() {
    let handler = handler("https://cleared.holipoly.io/graphql/");

    handler.set_auth_state(&TokenPair::new("t1", "r1")).unwrap();
    handler.clear_auth_state().unwrap();

    assert!(handler.get_auth_state().is_none());
}

#[test]
fn test_set_replaces_wholesale() {
    let handler = handler("https://replace.holipoly.io/graphql/");

    handler.set_auth_state(&TokenPair::new("t1", "r1")).unwrap();
    handler.set_auth_state(&TokenPair::new("t2", "r2")).unwrap();

    assert_eq!(handler.get_auth_state(), Some(TokenPair::new("t2", "r2")));
}

// ============================================================================
// Notification properties - exactly one event per mutation
// ============================================================================

#[test]
fn test_set_publishes_exactly_one_signed_in() {
    let handler = handler("https://one-signin.holipoly.io/graphql/");
    let mut events = handler.subscribe();

    handler.set_auth_state(&TokenPair::new("t1", "r1")).unwrap();

    assert_eq!(events.try_recv().unwrap(), AuthEvent::SignedIn);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_clear_publishes_exactly_one_signed_out() {
    let handler = handler("https://one-signout.holipoly.io/graphql/");
    handler.set_auth_state(&TokenPair::new("t1", "r1")).unwrap();

    let mut events = handler.subscribe();
    handler.clear_auth_state().unwrap();

    assert_eq!(events.try_recv().unwrap(), AuthEvent::SignedOut);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_clearing_absent_session_still_notifies() {
    let handler = handler("https://absent-clear.holipoly.io/graphql/");
    let mut events = handler.subscribe();

    handler.clear_auth_state().unwrap();

    assert_eq!(events.try_recv().unwrap(), AuthEvent::SignedOut);
}

// ============================================================================
// Cross-context delivery
// ============================================================================

#[test]
fn test_sign_out_in_one_context_reaches_the_other() {
    let store = MemoryStore::new();
    let base_url = "https://crosstab-out.holipoly.io/graphql/";
    let context_a = TokenStorageHandler::new(base_url, Arc::new(store.clone()));
    let context_b = TokenStorageHandler::new(base_url, Arc::new(store));

    context_a
        .set_auth_state(&TokenPair::new("t1", "r1"))
        .unwrap();
    let mut events_b = context_b.subscribe();

    // Context B does nothing itself - the notification is its only signal
    context_a.clear_auth_state().unwrap();

    assert_eq!(events_b.try_recv().unwrap(), AuthEvent::SignedOut);
    assert!(context_b.get_auth_state().is_none());
}

#[test]
fn test_sign_in_in_one_context_reaches_the_other() {
    let store = MemoryStore::new();
    let base_url = "https://crosstab-in.holipoly.io/graphql/";
    let context_a = TokenStorageHandler::new(base_url, Arc::new(store.clone()));
    let context_b = TokenStorageHandler::new(base_url, Arc::new(store));

    let mut events_b = context_b.subscribe();
    context_a
        .set_auth_state(&TokenPair::new("t1", "r1"))
        .unwrap();

    assert_eq!(events_b.try_recv().unwrap(), AuthEvent::SignedIn);
    assert_eq!(context_b.get_auth_state(), Some(TokenPair::new("t1", "r1")));
}

#[test]
fn test_handlers_for_different_backends_do_not_cross_talk() {
    let context_a = handler("https://isolated-a.holipoly.io/graphql/");
    let context_b = handler("https://isolated-b.holipoly.io/graphql/");

    let mut events_b = context_b.subscribe();
    context_a
        .set_auth_state(&TokenPair::new("t1", "r1"))
        .unwrap();

    assert!(matches!(events_b.try_recv(), Err(TryRecvError::Empty)));
    assert!(context_b.get_auth_state().is_none());
}
