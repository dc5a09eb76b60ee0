//! High-level client facade.
//!
//! [`KisClient`] wires the token store, auth manager, rate gate and
//! dispatcher together and exposes typed operations over the raw envelope
//! plumbing. One client instance is bound to one environment and one
//! account; all of its calls share a single rate budget.

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use time::{Date, OffsetDateTime};

use crate::auth::AuthManager;
use crate::dispatch::{CallSpec, Dispatcher};
use crate::endpoint::{tr_id, Endpoint, MARKET_STOCK};
use crate::environment::{AccountNumber, Credential, Environment};
use crate::error::{ApiError, ValidationError};
use crate::history::{RangeFetcher, RangeSeries};
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::models::{
    Balance, BalanceSummaryRow, Candle, CandleRow, Granularity, OpenOrderRow, Order, OrderBook,
    OrderSide, OrderStatus, OrderType, PositionRow, Ticker, TickerOutput,
};
use crate::rate_limit::RateGate;
use crate::retry::RetryConfig;
use crate::token::TokenStore;

/// Client construction parameters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credential: Credential,
    pub account: AccountNumber,
    /// Token cache location. Defaults to a per-environment file under the
    /// system temp directory.
    pub token_path: Option<PathBuf>,
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(credential: Credential, account: AccountNumber) -> Self {
        Self {
            credential,
            account,
            token_path: None,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn token_path_or_default(&self) -> PathBuf {
        match &self.token_path {
            Some(path) => path.clone(),
            None => std::env::temp_dir().join(format!(
                "openkis-token-{}.json",
                self.credential.environment
            )),
        }
    }
}

pub struct KisClient {
    environment: Environment,
    account: AccountNumber,
    dispatcher: Arc<Dispatcher>,
}

impl KisClient {
    /// Build a client over the production transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Build a client over an arbitrary transport. Tests inject scripted
    /// transports here.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpClient>) -> Self {
        let environment = config.credential.environment;
        let store = TokenStore::new(config.token_path_or_default());
        let auth = Arc::new(AuthManager::new(
            config.credential.clone(),
            transport.clone(),
            store,
        ));
        let gate = RateGate::new(environment);
        let dispatcher = Arc::new(Dispatcher::new(
            environment,
            transport,
            auth,
            gate,
            config.retry,
        ));

        Self {
            environment,
            account: config.account,
            dispatcher,
        }
    }

    pub const fn environment(&self) -> Environment {
        self.environment
    }

    pub fn account(&self) -> &AccountNumber {
        &self.account
    }

    /// Snapshot quote for one symbol.
    pub async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ApiError> {
        validate_symbol(symbol)?;
        let call = quote_call(Endpoint::Price, tr_id::PRICE, symbol);
        let payload = self.dispatcher.dispatch(&call).await?;
        let output: TickerOutput = decode_output(&payload, "output")?;
        Ok(Ticker::from_output(output, symbol))
    }

    /// Ten-level order book for one symbol.
    pub async fn fetch_order_book(&self, symbol: &str) -> Result<OrderBook, ApiError> {
        validate_symbol(symbol)?;
        let call = quote_call(Endpoint::OrderBook, tr_id::ORDERBOOK, symbol);
        let payload = self.dispatcher.dispatch(&call).await?;
        let output = payload
            .get("output1")
            .ok_or_else(|| ApiError::invalid_response("order book response missing output1"))?;
        Ok(OrderBook::from_output(output, symbol))
    }

    /// Recent candles, single upstream call (at most 30 rows), most recent
    /// last. `limit` trims to the newest rows.
    pub async fn fetch_ohlcv(
        &self,
        symbol: &str,
        granularity: Granularity,
        limit: usize,
    ) -> Result<Vec<Candle>, ApiError> {
        validate_symbol(symbol)?;
        let call = quote_call(Endpoint::DailyPrice, tr_id::DAILY_PRICE, symbol)
            .with_param("FID_PERIOD_DIV_CODE", granularity.period_code())
            .with_param("FID_ORG_ADJ_PRC", "0");
        let payload = self.dispatcher.dispatch(&call).await?;

        let rows: Vec<CandleRow> = decode_output(&payload, "output")?;
        let mut candles: Vec<Candle> = rows.iter().filter_map(Candle::from_row).collect();
        candles.sort_by_key(|c| c.date);
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        Ok(candles)
    }

    /// Historical candles over an arbitrary range, paginated through the
    /// chart endpoint. See [`RangeSeries`] for gap semantics.
    pub async fn fetch_ohlcv_range(
        &self,
        symbol: &str,
        start: Date,
        end: Date,
        granularity: Granularity,
    ) -> Result<RangeSeries, ApiError> {
        validate_symbol(symbol)?;
        RangeFetcher::new(self.dispatcher.clone())
            .fetch_range(symbol, start, end, granularity)
            .await
    }

    pub async fn create_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: u32,
        price: u32,
    ) -> Result<Order, ApiError> {
        if price == 0 {
            return Err(ValidationError::MissingLimitPrice.into());
        }
        self.create_order(symbol, side, OrderType::Limit, amount, Some(price))
            .await
    }

    pub async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: u32,
    ) -> Result<Order, ApiError> {
        self.create_order(symbol, side, OrderType::Market, amount, None)
            .await
    }

    async fn create_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        amount: u32,
        price: Option<u32>,
    ) -> Result<Order, ApiError> {
        validate_symbol(symbol)?;
        if amount == 0 {
            return Err(ValidationError::ZeroOrderAmount.into());
        }

        let body = serde_json::json!({
            "CANO": self.account.cano(),
            "ACNT_PRDT_CD": self.account.product_code(),
            "PDNO": symbol,
            "ORD_DVSN": order_type.division_code(),
            "ORD_QTY": amount.to_string(),
            "ORD_UNPR": price.unwrap_or(0).to_string(),
        });
        let call = CallSpec::post(
            Endpoint::OrderCash,
            tr_id::order(self.environment, side),
            body,
        );
        let payload = self.dispatcher.dispatch(&call).await?;

        let id = payload
            .get("output")
            .and_then(|o| o.get("ODNO"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| ApiError::invalid_response("order response missing ODNO"))?
            .to_owned();

        Ok(Order {
            id,
            symbol: symbol.to_owned(),
            side: Some(side),
            order_type,
            status: OrderStatus::Open,
            amount,
            price,
            filled: 0,
            remaining: amount,
            as_of: OffsetDateTime::now_utc(),
        })
    }

    /// Cancel an open order by ID, cancelling its full remaining quantity.
    ///
    /// The cancellation acknowledgement does not echo the order's side or
    /// price, so the open-orders list is consulted first to fill them in.
    /// When the order is no longer listed the cancel is still attempted and
    /// those fields stay `None`.
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order, ApiError> {
        let existing = self
            .fetch_open_order_rows()
            .await?
            .into_iter()
            .find(|row| row.id == order_id);

        let branch = existing
            .as_ref()
            .map(|row| row.branch.clone())
            .unwrap_or_default();

        let body = serde_json::json!({
            "CANO": self.account.cano(),
            "ACNT_PRDT_CD": self.account.product_code(),
            "KRX_FWDG_ORD_ORGNO": branch,
            "ORGN_ODNO": order_id,
            "ORD_DVSN": "00",
            // 02 = cancel (01 would be modify).
            "RVSE_CNCL_DVSN_CD": "02",
            "ORD_QTY": "0",
            "ORD_UNPR": "0",
            "QTY_ALL_ORD_YN": "Y",
        });
        let call = CallSpec::post(
            Endpoint::OrderModify,
            tr_id::order_modify(self.environment),
            body,
        );
        self.dispatcher.dispatch(&call).await?;

        let mut order = match existing.as_ref() {
            Some(row) => Order::from_open_order_row(row),
            None => Order {
                id: order_id.to_owned(),
                symbol: String::new(),
                side: None,
                order_type: OrderType::Limit,
                status: OrderStatus::Canceled,
                amount: 0,
                price: None,
                filled: 0,
                remaining: 0,
                as_of: OffsetDateTime::now_utc(),
            },
        };
        order.status = OrderStatus::Canceled;
        order.remaining = 0;
        Ok(order)
    }

    /// Orders still open (modifiable or cancellable).
    pub async fn fetch_open_orders(&self) -> Result<Vec<Order>, ApiError> {
        let rows = self.fetch_open_order_rows().await?;
        Ok(rows.iter().map(Order::from_open_order_row).collect())
    }

    async fn fetch_open_order_rows(&self) -> Result<Vec<OpenOrderRow>, ApiError> {
        let call = CallSpec::get(
            Endpoint::OpenOrders,
            tr_id::open_orders(self.environment),
        )
        .with_param("CANO", self.account.cano())
        .with_param("ACNT_PRDT_CD", self.account.product_code())
        .with_param("CTX_AREA_FK100", "")
        .with_param("CTX_AREA_NK100", "")
        .with_param("INQR_DVSN_1", "0")
        .with_param("INQR_DVSN_2", "0");
        let payload = self.dispatcher.dispatch(&call).await?;
        decode_output(&payload, "output")
    }

    /// Account valuation and held positions.
    pub async fn fetch_balance(&self) -> Result<Balance, ApiError> {
        let call = CallSpec::get(Endpoint::Balance, tr_id::balance(self.environment))
            .with_param("CANO", self.account.cano())
            .with_param("ACNT_PRDT_CD", self.account.product_code())
            .with_param("AFHR_FLPR_YN", "N")
            .with_param("OFL_YN", "")
            .with_param("INQR_DVSN", "02")
            .with_param("UNPR_DVSN", "01")
            .with_param("FUND_STTL_ICLD_YN", "N")
            .with_param("FNCG_AMT_AUTO_RDPT_YN", "N")
            .with_param("PRCS_DVSN", "00")
            .with_param("CTX_AREA_FK100", "")
            .with_param("CTX_AREA_NK100", "");
        let payload = self.dispatcher.dispatch(&call).await?;

        let positions: Vec<PositionRow> = decode_output(&payload, "output1")?;
        let summaries: Vec<BalanceSummaryRow> = decode_output(&payload, "output2")?;
        Ok(Balance::from_outputs(&positions, summaries.first()))
    }
}

fn quote_call(endpoint: Endpoint, tr_id: &'static str, symbol: &str) -> CallSpec {
    CallSpec::get(endpoint, tr_id)
        .with_param("FID_COND_MRKT_DIV_CODE", MARKET_STOCK)
        .with_param("FID_INPUT_ISCD", symbol)
}

/// KRX issue codes are numeric (six digits for stocks).
fn validate_symbol(symbol: &str) -> Result<(), ValidationError> {
    if symbol.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }
    if !symbol.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::SymbolNotNumeric {
            value: symbol.to_owned(),
        });
    }
    Ok(())
}

/// Pull a named output block out of the envelope and deserialize it.
fn decode_output<T: DeserializeOwned>(
    payload: &serde_json::Value,
    key: &str,
) -> Result<T, ApiError> {
    let output = payload
        .get(key)
        .ok_or_else(|| ApiError::invalid_response(format!("response missing {key}")))?;
    serde_json::from_value(output.clone())
        .map_err(|e| ApiError::invalid_response(format!("malformed {key}: {e}")))
}
