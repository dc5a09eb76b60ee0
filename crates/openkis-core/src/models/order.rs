use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::parse_u32;

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Decode the upstream `sll_buy_dvsn_cd` field (01 = sell, 02 = buy).
    pub fn from_division_code(code: &str) -> Option<Self> {
        match code {
            "01" => Some(Self::Sell),
            "02" => Some(Self::Buy),
            _ => None,
        }
    }
}

impl Display for OrderSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(format!("invalid order side '{other}'")),
        }
    }
}

/// Order pricing type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    /// ORD_DVSN code for the order-cash endpoint.
    pub const fn division_code(self) -> &'static str {
        match self {
            Self::Limit => "00",
            Self::Market => "01",
        }
    }
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
    Canceled,
}

/// One order as seen by this client.
///
/// `side` and `price` are `None` where the upstream response genuinely does
/// not carry them (notably cancellation acknowledgements for orders that
/// could not be looked up first); no placeholder values are synthesized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: Option<OrderSide>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub amount: u32,
    pub price: Option<u32>,
    pub filled: u32,
    pub remaining: u32,
    #[serde(skip)]
    pub as_of: OffsetDateTime,
}

/// Raw row from the open-orders (psbl-rvsecncl) query.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrderRow {
    #[serde(rename = "odno", default)]
    pub id: String,
    /// Branch number of the original order; echoed back on modify/cancel.
    #[serde(rename = "ord_gno_brno", default)]
    pub branch: String,
    #[serde(rename = "pdno", default)]
    pub symbol: String,
    #[serde(rename = "sll_buy_dvsn_cd", default)]
    pub side_code: String,
    #[serde(rename = "ord_qty", default)]
    pub amount: String,
    #[serde(rename = "ord_unpr", default)]
    pub price: String,
    #[serde(rename = "tot_ccld_qty", default)]
    pub filled: String,
    #[serde(rename = "psbl_qty", default)]
    pub remaining: String,
}

impl Order {
    pub fn from_open_order_row(row: &OpenOrderRow) -> Self {
        let price = parse_u32(&row.price);
        Self {
            id: row.id.clone(),
            symbol: row.symbol.clone(),
            side: OrderSide::from_division_code(&row.side_code),
            order_type: OrderType::Limit,
            status: OrderStatus::Open,
            amount: parse_u32(&row.amount),
            price: (price > 0).then_some(price),
            filled: parse_u32(&row.filled),
            remaining: parse_u32(&row.remaining),
            as_of: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_order_row_decodes_side_and_quantities() {
        let row: OpenOrderRow = serde_json::from_str(
            r#"{
                "odno": "0000123456",
                "pdno": "005930",
                "sll_buy_dvsn_cd": "01",
                "ord_qty": "10",
                "ord_unpr": "71000.00",
                "tot_ccld_qty": "4",
                "psbl_qty": "6"
            }"#,
        )
        .expect("parse row");

        let order = Order::from_open_order_row(&row);
        assert_eq!(order.side, Some(OrderSide::Sell));
        assert_eq!(order.amount, 10);
        assert_eq!(order.price, Some(71_000));
        assert_eq!(order.filled, 4);
        assert_eq!(order.remaining, 6);
    }

    #[test]
    fn unknown_side_code_stays_unknown() {
        assert_eq!(OrderSide::from_division_code("99"), None);
    }

    #[test]
    fn order_type_division_codes_match_upstream() {
        assert_eq!(OrderType::Limit.division_code(), "00");
        assert_eq!(OrderType::Market.division_code(), "01");
    }
}
