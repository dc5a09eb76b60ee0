//! Long-range historical fetches split into upstream-sized windows.
//!
//! The chart endpoint returns at most [`MAX_ROWS_PER_CALL`] rows per call, so
//! a long `[start, end]` range is partitioned into ordered windows, each
//! driven through the dispatcher sequentially. Adjacent windows share exactly
//! one boundary day; the merge dedups it with the later fetch winning.

use std::collections::BTreeMap;
use std::sync::Arc;

use time::{Date, Duration, Weekday};

use crate::dispatch::{CallSpec, Dispatcher};
use crate::endpoint::{tr_id, Endpoint, MARKET_STOCK};
use crate::error::{ApiError, ErrorKind, ValidationError};
use crate::models::{format_kis_date, Candle, CandleRow, Granularity};

/// Upstream row cap per chart call.
pub const MAX_ROWS_PER_CALL: usize = 100;

/// Date bounds of one sub-query, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestWindow {
    pub start: Date,
    pub end: Date,
}

impl RequestWindow {
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A window that failed after the dispatcher exhausted its retries.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGap {
    pub window: RequestWindow,
    pub error: ApiError,
}

/// A window that returned fewer rows than its trading-day calendar implies.
/// Expected for exchange holidays; recorded, never treated as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoDataRegion {
    pub window: RequestWindow,
    pub expected: u32,
    pub received: u32,
}

/// Assembled result of one range fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSeries {
    /// Ascending by date, no duplicates.
    pub candles: Vec<Candle>,
    pub gaps: Vec<DataGap>,
    pub no_data: Vec<NoDataRegion>,
}

impl RangeSeries {
    /// True when at least one window failed and its data is missing.
    pub fn is_partial(&self) -> bool {
        !self.gaps.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Splits a range into windows, drives them through the dispatcher and
/// merges the batches into one ordered series.
pub struct RangeFetcher {
    dispatcher: Arc<Dispatcher>,
    max_rows: usize,
}

impl RangeFetcher {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            max_rows: MAX_ROWS_PER_CALL,
        }
    }

    /// Override the per-call row cap. Smaller caps mean more windows.
    pub fn with_max_rows(dispatcher: Arc<Dispatcher>, max_rows: usize) -> Self {
        Self {
            dispatcher,
            max_rows: max_rows.max(2),
        }
    }

    /// Fetch `[start, end]` (inclusive) for one symbol.
    ///
    /// Window failures become [`DataGap`]s and the remaining windows still
    /// run; authentication failures abort the whole fetch since every later
    /// window would fail the same way. Dropping the returned future stops
    /// before the next window; a cancelled gate wait consumes no budget.
    pub async fn fetch_range(
        &self,
        symbol: &str,
        start: Date,
        end: Date,
        granularity: Granularity,
    ) -> Result<RangeSeries, ApiError> {
        if start > end {
            return Err(ValidationError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            }
            .into());
        }

        let windows = partition_windows(start, end, granularity, self.max_rows);
        let mut merged: BTreeMap<Date, Candle> = BTreeMap::new();
        let mut gaps = Vec::new();
        let mut no_data = Vec::new();

        for window in windows {
            match self.fetch_window(symbol, window, granularity).await {
                Ok(batch) => {
                    let received = merge_batch(&mut merged, window, batch);
                    if granularity == Granularity::Daily {
                        let expected = trading_day_span(window.start, window.end);
                        if received < expected {
                            no_data.push(NoDataRegion {
                                window,
                                expected,
                                received,
                            });
                        }
                    }
                }
                Err(error)
                    if matches!(
                        error.kind(),
                        ErrorKind::Authentication | ErrorKind::TokenExpired
                    ) =>
                {
                    return Err(error);
                }
                Err(error) => gaps.push(DataGap { window, error }),
            }
        }

        Ok(RangeSeries {
            candles: merged.into_values().collect(),
            gaps,
            no_data,
        })
    }

    async fn fetch_window(
        &self,
        symbol: &str,
        window: RequestWindow,
        granularity: Granularity,
    ) -> Result<Vec<Candle>, ApiError> {
        let call = CallSpec::get(Endpoint::ChartPrice, tr_id::CHART_PRICE)
            .with_param("FID_COND_MRKT_DIV_CODE", MARKET_STOCK)
            .with_param("FID_INPUT_ISCD", symbol)
            .with_param("FID_INPUT_DATE_1", format_kis_date(window.start))
            .with_param("FID_INPUT_DATE_2", format_kis_date(window.end))
            .with_param("FID_PERIOD_DIV_CODE", granularity.period_code())
            .with_param("FID_ORG_ADJ_PRC", "0");

        let payload = self.dispatcher.dispatch(&call).await?;
        let rows: Vec<CandleRow> = match payload.get("output2") {
            Some(output) => serde_json::from_value(output.clone()).map_err(|e| {
                ApiError::invalid_response(format!("malformed chart output2: {e}"))
            })?,
            None => Vec::new(),
        };

        Ok(rows.iter().filter_map(Candle::from_row).collect())
    }
}

/// Insert a window's batch into the running series. A date already present
/// (the shared boundary day) is overwritten, so the later fetch wins.
/// Returns how many in-window rows the batch carried.
fn merge_batch(
    merged: &mut BTreeMap<Date, Candle>,
    window: RequestWindow,
    batch: Vec<Candle>,
) -> u32 {
    let mut received = 0;
    for candle in batch {
        if window.contains(candle.date) {
            merged.insert(candle.date, candle);
            received += 1;
        }
    }
    received
}

/// Partition `[start, end]` into ordered windows of at most `max_rows`
/// granularity units. Each window's end date is its successor's start date,
/// so the union is exactly `[start, end]` with one-day seams.
pub fn partition_windows(
    start: Date,
    end: Date,
    granularity: Granularity,
    max_rows: usize,
) -> Vec<RequestWindow> {
    let units = max_rows.saturating_sub(1).max(1) as u32;
    let mut windows = Vec::new();
    let mut cursor = start;

    loop {
        let span_end = window_end(cursor, units, granularity).min(end);
        windows.push(RequestWindow {
            start: cursor,
            end: span_end,
        });
        if span_end >= end {
            break;
        }
        cursor = span_end;
    }

    windows
}

/// Date `units` granularity steps after `start`.
///
/// Weekly steps are exact seven-day strides. Monthly steps use a 28-day
/// stride, the shortest possible month, so a window can never hold more
/// rows than the upstream cap.
fn window_end(start: Date, units: u32, granularity: Granularity) -> Date {
    match granularity {
        Granularity::Daily => advance_trading_days(start, units),
        Granularity::Weekly => start
            .checked_add(Duration::weeks(i64::from(units)))
            .unwrap_or(Date::MAX),
        Granularity::Monthly => start
            .checked_add(Duration::days(28 * i64::from(units)))
            .unwrap_or(Date::MAX),
    }
}

fn is_trading_day(date: Date) -> bool {
    !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

/// The `n`th trading day after `date` (weekend starts normalize forward).
fn advance_trading_days(mut date: Date, mut remaining: u32) -> Date {
    while !is_trading_day(date) {
        match date.next_day() {
            Some(next) => date = next,
            None => return date,
        }
    }
    while remaining > 0 {
        match date.next_day() {
            Some(next) => date = next,
            None => return date,
        }
        if is_trading_day(date) {
            remaining -= 1;
        }
    }
    date
}

/// Inclusive count of weekday trading days in `[start, end]`.
fn trading_day_span(start: Date, end: Date) -> u32 {
    let mut count = 0;
    let mut date = start;
    while date <= end {
        if is_trading_day(date) {
            count += 1;
        }
        match date.next_day() {
            Some(next) => date = next,
            None => break,
        }
    }
    count
}
