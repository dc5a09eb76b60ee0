//! Domain models and KIS response transcoding.
//!
//! KIS returns every numeric field as a string; raw rows are deserialized
//! with their upstream field names and normalized into typed models here.
//! Missing or blank numeric fields read as zero, matching upstream behavior
//! for instruments without a value in that field.

mod balance;
mod candle;
mod order;
mod orderbook;
mod ticker;

pub use balance::{Balance, BalanceSummaryRow, Position, PositionRow};
pub use candle::{format_kis_date, parse_kis_date, Candle, CandleRow, Granularity};
pub use order::{OpenOrderRow, Order, OrderSide, OrderStatus, OrderType};
pub use orderbook::{OrderBook, OrderBookLevel};
pub use ticker::{Ticker, TickerOutput};

pub(crate) fn parse_f64(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

pub(crate) fn parse_u64(raw: &str) -> u64 {
    // Some endpoints render integers as "1234.0000".
    raw.trim()
        .parse::<u64>()
        .unwrap_or_else(|_| raw.trim().parse::<f64>().unwrap_or(0.0) as u64)
}

pub(crate) fn parse_u32(raw: &str) -> u32 {
    parse_u64(raw) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_garbage_numerics_read_as_zero() {
        assert_eq!(parse_f64(""), 0.0);
        assert_eq!(parse_f64("abc"), 0.0);
        assert_eq!(parse_u64(" 120 "), 120);
        assert_eq!(parse_u64("120.0000"), 120);
    }
}
