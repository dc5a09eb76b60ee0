//! Core client for the Korea Investment & Securities open API.
//!
//! This crate contains:
//! - Authenticated, rate-limited request pipeline (auth, gate, dispatch)
//! - Multi-window historical-data pagination
//! - Canonical domain models and envelope transcoding
//! - Transport abstraction with a reqwest-backed production client

pub mod auth;
pub mod client;
pub mod dispatch;
pub mod endpoint;
pub mod environment;
pub mod error;
pub mod history;
pub mod http;
pub mod models;
pub mod rate_limit;
pub mod retry;
pub mod token;

pub use auth::{AuthHeaders, AuthManager, EXPIRY_MARGIN};
pub use client::{ClientConfig, KisClient};
pub use dispatch::{CallSpec, Dispatcher, Outcome};
pub use endpoint::{tr_id, Endpoint, MARKET_STOCK};
pub use environment::{AccountNumber, Credential, Environment, RateBudget};
pub use error::{ApiError, ErrorKind, ValidationError};
pub use history::{
    partition_windows, DataGap, NoDataRegion, RangeFetcher, RangeSeries, RequestWindow,
    MAX_ROWS_PER_CALL,
};
pub use http::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};
pub use models::{
    Balance, Candle, Granularity, Order, OrderBook, OrderBookLevel, OrderSide, OrderStatus,
    OrderType, Position, Ticker,
};
pub use rate_limit::{RateGate, DEFAULT_MAX_WAIT};
pub use retry::{Backoff, RetryConfig};
pub use token::{Token, TokenStore};
