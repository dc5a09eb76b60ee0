//! KIS endpoint paths and transaction IDs.
//!
//! Every call carries a `tr_id` header identifying the upstream transaction.
//! Quote transactions are shared between environments; trading and account
//! transactions use a `T`-prefixed ID live and a `V`-prefixed ID on paper.

use std::fmt::{Display, Formatter};

use crate::environment::Environment;
use crate::models::OrderSide;

/// API paths, one per supported operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Token,
    Price,
    OrderBook,
    DailyPrice,
    ChartPrice,
    OrderCash,
    OrderModify,
    Balance,
    OpenOrders,
}

impl Endpoint {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Token => "/oauth2/tokenP",
            Self::Price => "/uapi/domestic-stock/v1/quotations/inquire-price",
            Self::OrderBook => "/uapi/domestic-stock/v1/quotations/inquire-asking-price-exp-ccn",
            Self::DailyPrice => "/uapi/domestic-stock/v1/quotations/inquire-daily-price",
            Self::ChartPrice => {
                "/uapi/domestic-stock/v1/quotations/inquire-daily-itemchartprice"
            }
            Self::OrderCash => "/uapi/domestic-stock/v1/trading/order-cash",
            Self::OrderModify => "/uapi/domestic-stock/v1/trading/order-rvsecncl",
            Self::Balance => "/uapi/domestic-stock/v1/trading/inquire-balance",
            Self::OpenOrders => "/uapi/domestic-stock/v1/trading/inquire-psbl-rvsecncl",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Market division code (FID_COND_MRKT_DIV_CODE). Stocks, ETFs and ETNs all
/// use `J`.
pub const MARKET_STOCK: &str = "J";

/// Transaction ID tables.
pub mod tr_id {
    use super::{Environment, OrderSide};

    pub const PRICE: &str = "FHKST01010100";
    pub const ORDERBOOK: &str = "FHKST01010200";
    pub const DAILY_PRICE: &str = "FHKST01010400";
    /// Date-bounded chart query; returns at most 100 rows per call.
    pub const CHART_PRICE: &str = "FHKST03010100";

    pub const fn order(environment: Environment, side: OrderSide) -> &'static str {
        match (environment, side) {
            (Environment::Live, OrderSide::Buy) => "TTTC0802U",
            (Environment::Live, OrderSide::Sell) => "TTTC0801U",
            (Environment::Paper, OrderSide::Buy) => "VTTC0802U",
            (Environment::Paper, OrderSide::Sell) => "VTTC0801U",
        }
    }

    pub const fn order_modify(environment: Environment) -> &'static str {
        match environment {
            Environment::Live => "TTTC0803U",
            Environment::Paper => "VTTC0803U",
        }
    }

    pub const fn balance(environment: Environment) -> &'static str {
        match environment {
            Environment::Live => "TTTC8434R",
            Environment::Paper => "VTTC8434R",
        }
    }

    pub const fn open_orders(environment: Environment) -> &'static str {
        match environment {
            Environment::Live => "TTTC8036R",
            Environment::Paper => "VTTC8036R",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trading_tr_ids_differ_per_environment() {
        assert_eq!(tr_id::order(Environment::Live, OrderSide::Buy), "TTTC0802U");
        assert_eq!(
            tr_id::order(Environment::Paper, OrderSide::Buy),
            "VTTC0802U"
        );
        assert_ne!(
            tr_id::balance(Environment::Live),
            tr_id::balance(Environment::Paper)
        );
    }

    #[test]
    fn quote_paths_are_under_domestic_stock_quotations() {
        assert!(Endpoint::Price.path().contains("/quotations/"));
        assert!(Endpoint::DailyPrice.path().ends_with("inquire-daily-price"));
    }
}
