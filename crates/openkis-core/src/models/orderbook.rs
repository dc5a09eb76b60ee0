use serde::Serialize;
use time::OffsetDateTime;

use super::{parse_f64, parse_u64};

/// One price level with its resting quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderBookLevel {
    pub price: f64,
    pub amount: u64,
}

/// Ten-level order book. Asks ascend from best offer, bids descend from
/// best bid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBook {
    pub symbol: String,
    pub asks: Vec<OrderBookLevel>,
    pub bids: Vec<OrderBookLevel>,
    #[serde(skip)]
    pub as_of: OffsetDateTime,
}

impl OrderBook {
    /// Build from the `inquire-asking-price` output1 block. Level fields are
    /// positionally named (`askp1`..`askp10`, `bidp_rsqn1`..), so this walks
    /// the JSON object rather than a fixed serde struct.
    pub fn from_output(output: &serde_json::Value, symbol: &str) -> Self {
        let mut asks = Vec::with_capacity(10);
        let mut bids = Vec::with_capacity(10);

        for level in 1..=10 {
            if let Some(ask) = read_level(output, "askp", level) {
                asks.push(ask);
            }
            if let Some(bid) = read_level(output, "bidp", level) {
                bids.push(bid);
            }
        }

        Self {
            symbol: symbol.to_owned(),
            asks,
            bids,
            as_of: OffsetDateTime::now_utc(),
        }
    }
}

fn read_level(output: &serde_json::Value, prefix: &str, level: usize) -> Option<OrderBookLevel> {
    let price = parse_f64(output.get(format!("{prefix}{level}"))?.as_str()?);
    if price <= 0.0 {
        return None;
    }

    let amount = output
        .get(format!("{prefix}_rsqn{level}"))
        .and_then(|v| v.as_str())
        .map(parse_u64)
        .unwrap_or(0);

    Some(OrderBookLevel { price, amount })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_populated_levels_and_skips_empty_ones() {
        let output = serde_json::json!({
            "askp1": "71900", "askp_rsqn1": "1200",
            "askp2": "72000", "askp_rsqn2": "800",
            "askp3": "0",
            "bidp1": "71800", "bidp_rsqn1": "950",
        });

        let book = OrderBook::from_output(&output, "005930");
        assert_eq!(book.asks.len(), 2);
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.asks[0].price, 71900.0);
        assert_eq!(book.asks[0].amount, 1200);
        assert_eq!(book.bids[0].price, 71800.0);
    }
}
