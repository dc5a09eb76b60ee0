//! Error taxonomy for the request pipeline.
//!
//! Upstream failures are folded into a closed [`ErrorKind`] enumeration via a
//! fixed lookup table from KIS response codes; unknown codes map to
//! [`ErrorKind::BusinessRejected`] rather than failing the lookup.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Validation errors for request parameters and domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol must be numeric (KRX issue code): '{value}'")]
    SymbolNotNumeric { value: String },
    #[error("invalid granularity '{value}', expected one of 1d, 1w, 1M")]
    InvalidGranularity { value: String },
    #[error("account number must look like '12345678-01': '{value}'")]
    InvalidAccountNumber { value: String },
    #[error("range start {start} must not be after end {end}")]
    InvertedRange { start: String, end: String },
    #[error("order amount must be greater than zero")]
    ZeroOrderAmount,
    #[error("limit orders require a price")]
    MissingLimitPrice,
}

/// Pipeline error classification.
///
/// Closed set; retry eligibility is a property of the kind, not of the
/// call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad credentials. Fatal, never retried.
    Authentication,
    /// Access token rejected as expired; the dispatcher forces one refresh
    /// and replays the call once.
    TokenExpired,
    /// Upstream signalled call-budget overflow, or the local gate timed out.
    RateLimited,
    /// Transport-level timeout or connection failure.
    TransientNetwork,
    /// Domain rejection (insufficient balance, market closed, unknown
    /// upstream code). Surfaced immediately, never retried.
    BusinessRejected,
    /// A range-fetch sub-window produced no usable data after retries.
    DataGap,
    /// Response body could not be parsed as a KIS envelope.
    InvalidResponse,
    /// Request construction or internal invariant failure.
    Internal,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::TokenExpired => "token_expired",
            Self::RateLimited => "rate_limited",
            Self::TransientNetwork => "transient_network",
            Self::BusinessRejected => "business_rejected",
            Self::DataGap => "data_gap",
            Self::InvalidResponse => "invalid_response",
            Self::Internal => "internal",
        }
    }

    /// Whether the dispatcher may retry a failure of this kind.
    pub const fn retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientNetwork)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured pipeline error carrying the upstream code when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    code: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn transient_network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientNetwork, message)
    }

    pub fn business_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BusinessRejected, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub const fn retryable(&self) -> bool {
        self.kind.retryable()
    }

    /// Wrap a final retryable failure with the call that caused it.
    pub(crate) fn exhausted(self, path: &str, attempts: u32) -> Self {
        Self {
            message: format!(
                "{} (gave up on '{path}' after {attempts} attempts)",
                self.message
            ),
            ..self
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} [{}/{}]", self.message, self.kind, code),
            None => write!(f, "{} [{}]", self.message, self.kind),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::internal(error.to_string())
    }
}

/// Fixed KIS response-code table.
///
/// `EGW*` codes come from the API gateway, `OPSP*` from the order system.
/// Anything unmapped is a domain rejection carrying its original code.
pub fn kind_for_code(code: &str) -> ErrorKind {
    match code {
        "EGW00001" => ErrorKind::Authentication,
        "EGW00002" => ErrorKind::TokenExpired,
        // Gateway per-second transaction cap, signalled inside a 200 envelope.
        "EGW00201" => ErrorKind::RateLimited,
        "OPSP0001" | "OPSP0010" => ErrorKind::BusinessRejected,
        _ => ErrorKind::BusinessRejected,
    }
}

/// Build the error for a non-success KIS envelope.
pub fn error_for_code(code: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(kind_for_code(code), message).with_code(code)
}
