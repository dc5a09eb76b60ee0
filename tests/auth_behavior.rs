//! Behavior tests for the token lifecycle.
//!
//! These verify HOW the auth manager handles concurrent refreshes, cache
//! reuse across restarts, and credential rejection.

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use time::Duration as TimeDuration;

use openkis_core::{AuthManager, ErrorKind, TokenStore};
use openkis_tests::{auth_for, paper_credential, FakeKis};

#[tokio::test]
async fn concurrent_callers_share_a_single_token_exchange() {
    // Given: no cached token and a deliberately slow exchange
    let dir = tempdir().expect("tempdir");
    let transport = Arc::new(FakeKis::new().with_token_delay(Duration::from_millis(30)));
    let auth = auth_for(transport.clone(), dir.path());

    // When: eight callers request headers at once
    let mut handles = Vec::new();
    for _ in 0..8 {
        let auth = auth.clone();
        handles.push(tokio::spawn(async move { auth.get_headers().await }));
    }
    for handle in handles {
        handle.await.expect("task").expect("headers");
    }

    // Then: exactly one exchange happened; everyone waited on it
    assert_eq!(transport.token_exchanges(), 1);
}

#[tokio::test]
async fn cached_token_survives_a_restart() {
    // Given: a manager that has exchanged and persisted a token
    let dir = tempdir().expect("tempdir");
    let transport = Arc::new(FakeKis::new());
    let first = auth_for(transport.clone(), dir.path());
    first.get_headers().await.expect("first headers");
    assert_eq!(transport.token_exchanges(), 1);

    // When: a fresh manager starts over the same store
    let second = auth_for(transport.clone(), dir.path());
    let headers = second.get_headers().await.expect("second headers");

    // Then: the persisted token is reused without another exchange
    assert_eq!(transport.token_exchanges(), 1);
    assert_eq!(
        headers.get("authorization").map(String::as_str),
        Some("Bearer tok-1")
    );
}

#[tokio::test]
async fn rejected_credentials_surface_and_persist_nothing() {
    // Given: an upstream that rejects the app secret
    let dir = tempdir().expect("tempdir");
    let transport = Arc::new(FakeKis::rejecting_tokens());
    let auth = auth_for(transport.clone(), dir.path());

    // When: headers are requested
    let error = auth.get_headers().await.expect_err("must fail");

    // Then: the failure is an authentication error with the gateway code,
    // and no token file was written
    assert_eq!(error.kind(), ErrorKind::Authentication);
    assert_eq!(error.code(), Some("EGW00001"));
    assert!(!dir.path().join("token.json").exists());
}

#[tokio::test]
async fn token_inside_expiry_margin_is_reexchanged() {
    // Given: a margin wider than the token's whole validity, so every token
    // is already "expired" the moment it is issued
    let dir = tempdir().expect("tempdir");
    let transport = Arc::new(FakeKis::new());
    let auth = AuthManager::new(
        paper_credential(),
        transport.clone(),
        TokenStore::new(dir.path().join("token.json")),
    )
    .with_margin(TimeDuration::hours(25));

    // When: headers are requested twice
    auth.get_headers().await.expect("first");
    auth.get_headers().await.expect("second");

    // Then: each request forced a fresh exchange
    assert_eq!(transport.token_exchanges(), 2);
}
