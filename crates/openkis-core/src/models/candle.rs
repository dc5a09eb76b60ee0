use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::error::ValidationError;

use super::{parse_f64, parse_u64};

/// Time bucket for historical candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
    #[serde(rename = "1M")]
    Monthly,
}

impl Granularity {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1w",
            Self::Monthly => "1M",
        }
    }

    /// FID_PERIOD_DIV_CODE value for the daily-price endpoint.
    pub const fn period_code(self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "1d" | "d" | "D" => Ok(Self::Daily),
            "1w" | "w" | "W" => Ok(Self::Weekly),
            "1M" | "M" => Ok(Self::Monthly),
            other => Err(ValidationError::InvalidGranularity {
                value: other.to_owned(),
            }),
        }
    }
}

/// One OHLCV observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Raw daily-price row as returned by the upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct CandleRow {
    #[serde(rename = "stck_bsop_date", default)]
    pub date: String,
    #[serde(rename = "stck_oprc", default)]
    pub open: String,
    #[serde(rename = "stck_hgpr", default)]
    pub high: String,
    #[serde(rename = "stck_lwpr", default)]
    pub low: String,
    #[serde(rename = "stck_clpr", default)]
    pub close: String,
    #[serde(rename = "acml_vol", default)]
    pub volume: String,
}

impl Candle {
    /// Normalize one raw row; rows without a business date are dropped.
    pub fn from_row(row: &CandleRow) -> Option<Self> {
        let date = parse_kis_date(&row.date)?;
        Some(Self {
            date,
            open: parse_f64(&row.open),
            high: parse_f64(&row.high),
            low: parse_f64(&row.low),
            close: parse_f64(&row.close),
            volume: parse_u64(&row.volume),
        })
    }
}

/// Parse the upstream `YYYYMMDD` business-date format.
pub fn parse_kis_date(raw: &str) -> Option<Date> {
    let format = format_description!("[year][month][day]");
    Date::parse(raw.trim(), &format).ok()
}

/// Render a date in the upstream `YYYYMMDD` format.
pub fn format_kis_date(date: Date) -> String {
    let format = format_description!("[year][month][day]");
    date.format(&format).expect("date formats as YYYYMMDD")
}
