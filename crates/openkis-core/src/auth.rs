//! Access-token lifecycle.
//!
//! [`AuthManager`] owns the cached token and its persistence. Refresh is
//! single-flight: the slot is held behind an async mutex for the whole
//! credential exchange, so every caller that finds the token expired waits
//! on the one in-flight exchange instead of issuing its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::endpoint::Endpoint;
use crate::environment::Credential;
use crate::error::ApiError;
use crate::http::{HttpClient, HttpRequest};
use crate::token::{Token, TokenStore};

/// Safety margin before nominal expiry within which a token is treated as
/// already expired.
pub const EXPIRY_MARGIN: Duration = Duration::minutes(5);

const DEFAULT_VALIDITY_SECS: i64 = 86_400;

/// Request headers for one authenticated call.
pub type AuthHeaders = BTreeMap<String, String>;

pub struct AuthManager {
    credential: Credential,
    transport: Arc<dyn HttpClient>,
    store: TokenStore,
    slot: Mutex<Option<Token>>,
    margin: Duration,
}

impl AuthManager {
    /// Build a manager, seeding the slot from the on-disk cache when a
    /// non-stale record exists.
    pub fn new(credential: Credential, transport: Arc<dyn HttpClient>, store: TokenStore) -> Self {
        let cached = store.load();
        Self {
            credential,
            transport,
            store,
            slot: Mutex::new(cached),
            margin: EXPIRY_MARGIN,
        }
    }

    /// Override the expiry margin. Mostly useful in tests that need to force
    /// the expired path without waiting out a real token lifetime.
    pub fn with_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    /// Headers for an authenticated call, refreshing the token first when it
    /// is absent or inside the expiry margin.
    pub async fn get_headers(&self) -> Result<AuthHeaders, ApiError> {
        let mut slot = self.slot.lock().await;

        let needs_refresh = match slot.as_ref() {
            Some(token) => token.is_expired_at(OffsetDateTime::now_utc(), self.margin),
            None => true,
        };

        if needs_refresh {
            let token = self.exchange_credentials().await?;
            // Persistence is best-effort; the in-memory token is
            // authoritative and a miss only costs one exchange next start.
            let _ = self.store.save(&token);
            *slot = Some(token);
        }

        match slot.as_ref() {
            Some(token) => Ok(self.build_headers(&token.value)),
            None => Err(ApiError::internal("token slot empty after refresh")),
        }
    }

    /// Discard the cached token so the next `get_headers` re-exchanges.
    /// Used by the dispatcher when the upstream rejects a token as expired
    /// ahead of its nominal lifetime.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }

    async fn exchange_credentials(&self) -> Result<Token, ApiError> {
        let url = format!(
            "{}{}",
            self.credential.environment.base_url(),
            Endpoint::Token.path()
        );
        let body = serde_json::json!({
            "grant_type": "client_credentials",
            "appkey": self.credential.app_key,
            "appsecret": self.credential.app_secret,
        });
        let request = HttpRequest::post(url)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_json_body(&body);

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| ApiError::authentication(format!("token exchange failed: {e}")))?;

        let grant: TokenGrantResponse = serde_json::from_str(&response.body).map_err(|e| {
            ApiError::authentication(format!("token exchange returned unparsable body: {e}"))
        })?;

        match grant.access_token {
            Some(value) if response.is_success() => {
                let issued_at = OffsetDateTime::now_utc();
                let valid_for =
                    Duration::seconds(grant.expires_in.unwrap_or(DEFAULT_VALIDITY_SECS));
                Ok(Token::new(value, issued_at, valid_for))
            }
            _ => {
                let message = grant
                    .msg1
                    .unwrap_or_else(|| format!("token exchange rejected (http {})", response.status));
                let error = ApiError::authentication(message);
                Err(match grant.msg_cd {
                    Some(code) => error.with_code(code),
                    None => error,
                })
            }
        }
    }

    fn build_headers(&self, token_value: &str) -> AuthHeaders {
        let mut headers = BTreeMap::new();
        headers.insert(
            String::from("authorization"),
            format!("Bearer {token_value}"),
        );
        headers.insert(String::from("appkey"), self.credential.app_key.clone());
        headers.insert(
            String::from("appsecret"),
            self.credential.app_secret.clone(),
        );
        headers.insert(
            String::from("content-type"),
            String::from("application/json; charset=utf-8"),
        );
        headers
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrantResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    msg_cd: Option<String>,
    msg1: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::http::{HttpError, HttpResponse};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct ScriptedTransport {
        body: String,
        status: u16,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn granting(token: &str) -> Self {
            Self {
                body: format!(r#"{{"access_token":"{token}","expires_in":86400}}"#),
                status: 200,
                calls: AtomicUsize::new(0),
            }
        }

        fn rejecting() -> Self {
            Self {
                body: r#"{"msg_cd":"EGW00001","msg1":"invalid appsecret"}"#.to_string(),
                status: 403,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpClient for ScriptedTransport {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = HttpResponse {
                status: self.status,
                body: self.body.clone(),
            };
            Box::pin(async move { Ok(response) })
        }
    }

    fn credential() -> Credential {
        Credential::new("key", "secret", Environment::Paper)
    }

    #[tokio::test]
    async fn headers_carry_bearer_token_and_app_identity() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(ScriptedTransport::granting("tok-1"));
        let auth = AuthManager::new(
            credential(),
            transport.clone(),
            TokenStore::new(dir.path().join("token.json")),
        );

        let headers = auth.get_headers().await.expect("headers");
        assert_eq!(
            headers.get("authorization").map(String::as_str),
            Some("Bearer tok-1")
        );
        assert_eq!(headers.get("appkey").map(String::as_str), Some("key"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn valid_cached_token_skips_the_exchange() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(ScriptedTransport::granting("tok-2"));
        let auth = AuthManager::new(
            credential(),
            transport.clone(),
            TokenStore::new(dir.path().join("token.json")),
        );

        auth.get_headers().await.expect("first");
        auth.get_headers().await.expect("second");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn rejected_exchange_surfaces_authentication_error_and_persists_nothing() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("token.json");
        let auth = AuthManager::new(
            credential(),
            Arc::new(ScriptedTransport::rejecting()),
            TokenStore::new(path.clone()),
        );

        let error = auth.get_headers().await.expect_err("must fail");
        assert_eq!(error.kind(), crate::error::ErrorKind::Authentication);
        assert_eq!(error.code(), Some("EGW00001"));
        assert!(!path.exists(), "no token file may be written on failure");
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_exchange() {
        let dir = tempdir().expect("tempdir");
        let transport = Arc::new(ScriptedTransport::granting("tok-3"));
        let auth = AuthManager::new(
            credential(),
            transport.clone(),
            TokenStore::new(dir.path().join("token.json")),
        );

        auth.get_headers().await.expect("first");
        auth.invalidate().await;
        auth.get_headers().await.expect("second");
        assert_eq!(transport.call_count(), 2);
    }
}
