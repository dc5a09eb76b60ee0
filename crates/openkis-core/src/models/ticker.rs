use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{parse_f64, parse_u64};

/// Snapshot quote for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticker {
    pub symbol: String,
    pub name: Option<String>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub last: f64,
    pub volume: u64,
    /// Signed change versus the previous close, in won.
    pub change: f64,
    /// Signed change percentage.
    pub change_percent: f64,
    #[serde(skip)]
    pub as_of: OffsetDateTime,
}

/// Raw `inquire-price` output block.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerOutput {
    #[serde(rename = "stck_prpr", default)]
    last: String,
    #[serde(rename = "stck_oprc", default)]
    open: String,
    #[serde(rename = "stck_hgpr", default)]
    high: String,
    #[serde(rename = "stck_lwpr", default)]
    low: String,
    #[serde(rename = "acml_vol", default)]
    volume: String,
    #[serde(rename = "prdy_vrss", default)]
    change: String,
    /// 1/2 = up, 3 = flat, 4/5 = down.
    #[serde(rename = "prdy_vrss_sign", default)]
    change_sign: String,
    #[serde(rename = "prdy_ctrt", default)]
    change_percent: String,
    #[serde(rename = "hts_kor_isnm", default)]
    name: Option<String>,
}

impl Ticker {
    pub fn from_output(output: TickerOutput, symbol: &str) -> Self {
        let falling = matches!(output.change_sign.as_str(), "4" | "5");
        let signed = |value: f64| if falling { -value.abs() } else { value };

        Self {
            symbol: symbol.to_owned(),
            name: output.name.filter(|n| !n.is_empty()),
            open: parse_f64(&output.open),
            high: parse_f64(&output.high),
            low: parse_f64(&output.low),
            last: parse_f64(&output.last),
            volume: parse_u64(&output.volume),
            change: signed(parse_f64(&output.change)),
            change_percent: signed(parse_f64(&output.change_percent)),
            as_of: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falling_sign_negates_change_fields() {
        let output: TickerOutput = serde_json::from_str(
            r#"{
                "stck_prpr": "71900",
                "stck_oprc": "72800",
                "stck_hgpr": "72900",
                "stck_lwpr": "71800",
                "acml_vol": "9558270",
                "prdy_vrss": "900",
                "prdy_vrss_sign": "5",
                "prdy_ctrt": "1.24",
                "hts_kor_isnm": "삼성전자"
            }"#,
        )
        .expect("parse output");

        let ticker = Ticker::from_output(output, "005930");
        assert_eq!(ticker.last, 71900.0);
        assert_eq!(ticker.change, -900.0);
        assert_eq!(ticker.change_percent, -1.24);
        assert_eq!(ticker.name.as_deref(), Some("삼성전자"));
    }

    #[test]
    fn rising_sign_keeps_change_positive() {
        let output: TickerOutput = serde_json::from_str(
            r#"{"stck_prpr":"100","prdy_vrss":"5","prdy_vrss_sign":"2","prdy_ctrt":"5.26"}"#,
        )
        .expect("parse output");

        let ticker = Ticker::from_output(output, "000660");
        assert_eq!(ticker.change, 5.0);
        assert_eq!(ticker.change_percent, 5.26);
        assert!(ticker.name.is_none());
    }
}
