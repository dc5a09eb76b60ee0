//! Single logical API call: gate, authenticate, invoke, classify, retry.
//!
//! Classification produces an explicit [`Outcome`] and the retry loop makes
//! its decision by inspecting it; no control flow rides on caught errors.

use std::sync::Arc;

use crate::auth::AuthManager;
use crate::endpoint::Endpoint;
use crate::environment::Environment;
use crate::error::{error_for_code, ApiError, ErrorKind};
use crate::http::{HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse};
use crate::rate_limit::RateGate;
use crate::retry::RetryConfig;

/// Parameters of one upstream call.
#[derive(Debug, Clone)]
pub struct CallSpec {
    pub method: HttpMethod,
    pub endpoint: Endpoint,
    pub tr_id: &'static str,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl CallSpec {
    pub fn get(endpoint: Endpoint, tr_id: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            endpoint,
            tr_id,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(endpoint: Endpoint, tr_id: &'static str, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            endpoint,
            tr_id,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Classifier verdict for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Upstream accepted the call; payload is the full response envelope.
    Success(serde_json::Value),
    /// Infrastructure failure worth retrying with backoff.
    Retryable(ApiError),
    /// The access token was rejected as expired; eligible for one forced
    /// re-auth and a single replay.
    Expired(ApiError),
    /// Caller-visible failure; surfaced immediately.
    Fatal(ApiError),
}

/// Classify a transport-level result.
pub fn classify_transport(error: HttpError) -> Outcome {
    let what = if error.is_timeout() {
        "timeout"
    } else {
        "connection failure"
    };
    Outcome::Retryable(ApiError::transient_network(format!(
        "transport {what}: {error}"
    )))
}

/// Classify an HTTP response from the upstream.
pub fn classify(response: &HttpResponse) -> Outcome {
    if response.status == 429 {
        return Outcome::Retryable(ApiError::rate_limited(
            "upstream returned 429 (per-second call limit exceeded)",
        ));
    }

    let payload: serde_json::Value = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(_) if response.status >= 500 => {
            return Outcome::Retryable(ApiError::transient_network(format!(
                "upstream returned status {}",
                response.status
            )));
        }
        Err(e) => {
            return Outcome::Fatal(ApiError::invalid_response(format!(
                "unparsable response body (status {}): {e}",
                response.status
            )));
        }
    };

    match payload.get("rt_cd").and_then(|v| v.as_str()) {
        Some("0") => Outcome::Success(payload),
        Some(_) => {
            let code = payload
                .get("msg_cd")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let message = payload
                .get("msg1")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or("upstream rejected the call");
            let error = error_for_code(code, message);

            match error.kind() {
                ErrorKind::TokenExpired => Outcome::Expired(error),
                kind if kind.retryable() => Outcome::Retryable(error),
                _ => Outcome::Fatal(error),
            }
        }
        None if response.status >= 500 => Outcome::Retryable(ApiError::transient_network(
            format!("upstream returned status {}", response.status),
        )),
        None => Outcome::Fatal(ApiError::invalid_response(
            "response envelope is missing rt_cd",
        )),
    }
}

/// Drives one logical call through the shared gate and auth manager.
pub struct Dispatcher {
    environment: Environment,
    transport: Arc<dyn HttpClient>,
    auth: Arc<AuthManager>,
    gate: RateGate,
    retry: RetryConfig,
}

impl Dispatcher {
    pub fn new(
        environment: Environment,
        transport: Arc<dyn HttpClient>,
        auth: Arc<AuthManager>,
        gate: RateGate,
        retry: RetryConfig,
    ) -> Self {
        Self {
            environment,
            transport,
            auth,
            gate,
            retry,
        }
    }

    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Execute one call to completion.
    ///
    /// Retryable outcomes are absorbed up to the configured attempt count
    /// with exponential backoff; a token-expired verdict triggers exactly
    /// one forced re-auth plus one replay; everything else surfaces
    /// unchanged.
    pub async fn dispatch(&self, call: &CallSpec) -> Result<serde_json::Value, ApiError> {
        let mut reauth_used = false;
        let mut attempt: u32 = 0;

        loop {
            self.gate.acquire().await?;
            let headers = self.auth.get_headers().await?;

            let request = self.build_request(call, &headers);
            let outcome = match self.transport.execute(request).await {
                Ok(response) => classify(&response),
                Err(error) => classify_transport(error),
            };

            match outcome {
                Outcome::Success(payload) => return Ok(payload),
                Outcome::Retryable(error) => {
                    if attempt >= self.retry.max_retries {
                        return Err(error.exhausted(call.endpoint.path(), attempt + 1));
                    }
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Outcome::Expired(error) => {
                    if reauth_used {
                        return Err(error);
                    }
                    reauth_used = true;
                    self.auth.invalidate().await;
                }
                Outcome::Fatal(error) => return Err(error),
            }
        }
    }

    fn build_request(&self, call: &CallSpec, headers: &crate::auth::AuthHeaders) -> HttpRequest {
        let url = format!("{}{}", self.environment.base_url(), call.endpoint.path());
        let mut request = HttpRequest::new(call.method, url)
            .with_headers(headers)
            .with_header("tr_id", call.tr_id);

        for (name, value) in &call.query {
            request = request.with_query(name.clone(), value.clone());
        }

        if let Some(body) = &call.body {
            request = request.with_json_body(body);
        }

        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn success_envelope_classifies_as_success() {
        let outcome = classify(&response(200, r#"{"rt_cd":"0","output":{}}"#));
        assert!(matches!(outcome, Outcome::Success(_)));
    }

    #[test]
    fn http_429_is_retryable_rate_limit() {
        let outcome = classify(&response(429, ""));
        match outcome {
            Outcome::Retryable(error) => assert_eq!(error.kind(), ErrorKind::RateLimited),
            other => panic!("expected retryable, got {other:?}"),
        }
    }

    #[test]
    fn expired_token_code_yields_expired_outcome() {
        let outcome = classify(&response(
            200,
            r#"{"rt_cd":"1","msg_cd":"EGW00002","msg1":"token expired"}"#,
        ));
        match outcome {
            Outcome::Expired(error) => {
                assert_eq!(error.kind(), ErrorKind::TokenExpired);
                assert_eq!(error.code(), Some("EGW00002"));
            }
            other => panic!("expected expired, got {other:?}"),
        }
    }

    #[test]
    fn business_rejection_is_fatal() {
        let outcome = classify(&response(
            200,
            r#"{"rt_cd":"1","msg_cd":"OPSP0001","msg1":"insufficient balance"}"#,
        ));
        match outcome {
            Outcome::Fatal(error) => {
                assert_eq!(error.kind(), ErrorKind::BusinessRejected);
                assert!(!error.retryable());
            }
            other => panic!("expected fatal, got {other:?}"),
        }
    }

    #[test]
    fn envelope_level_rate_limit_code_is_retryable() {
        let outcome = classify(&response(
            200,
            r#"{"rt_cd":"1","msg_cd":"EGW00201","msg1":"too many transactions"}"#,
        ));
        assert!(matches!(outcome, Outcome::Retryable(_)));
    }

    #[test]
    fn garbage_body_on_5xx_is_retryable_but_fatal_on_2xx() {
        assert!(matches!(
            classify(&response(502, "<html>bad gateway</html>")),
            Outcome::Retryable(_)
        ));
        assert!(matches!(
            classify(&response(200, "<html>?</html>")),
            Outcome::Fatal(_)
        ));
    }

    #[test]
    fn transport_timeout_is_retryable() {
        let outcome = classify_transport(HttpError::timed_out("deadline exceeded"));
        match outcome {
            Outcome::Retryable(error) => {
                assert_eq!(error.kind(), ErrorKind::TransientNetwork);
                assert!(error.message().contains("timeout"));
            }
            other => panic!("expected retryable, got {other:?}"),
        }
    }
}
