use serde::{Deserialize, Serialize};

use super::{parse_f64, parse_u32};

/// One held instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub name: String,
    pub amount: u32,
    pub average_price: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percent: f64,
}

/// Account valuation snapshot with held positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    pub total: f64,
    pub free: f64,
    pub deposit: f64,
    pub total_pnl: f64,
    pub total_pnl_percent: f64,
    pub positions: Vec<Position>,
}

impl Balance {
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }

    pub fn from_outputs(rows: &[PositionRow], summary: Option<&BalanceSummaryRow>) -> Self {
        let positions = rows
            .iter()
            .filter_map(Position::from_row)
            .collect::<Vec<_>>();

        match summary {
            Some(s) => Self {
                total: parse_f64(&s.total),
                free: parse_f64(&s.free),
                deposit: parse_f64(&s.deposit),
                total_pnl: parse_f64(&s.total_pnl),
                total_pnl_percent: parse_f64(&s.total_pnl_percent),
                positions,
            },
            None => Self {
                total: 0.0,
                free: 0.0,
                deposit: 0.0,
                total_pnl: 0.0,
                total_pnl_percent: 0.0,
                positions,
            },
        }
    }
}

impl Position {
    /// Zero-quantity rows (sold out today) are dropped.
    fn from_row(row: &PositionRow) -> Option<Self> {
        let amount = parse_u32(&row.amount);
        if amount == 0 {
            return None;
        }

        Some(Self {
            symbol: row.symbol.clone(),
            name: row.name.clone(),
            amount,
            average_price: parse_f64(&row.average_price),
            current_price: parse_f64(&row.current_price),
            unrealized_pnl: parse_f64(&row.unrealized_pnl),
            unrealized_pnl_percent: parse_f64(&row.unrealized_pnl_percent),
        })
    }
}

/// Raw holding row (balance output1).
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRow {
    #[serde(rename = "pdno", default)]
    pub symbol: String,
    #[serde(rename = "prdt_name", default)]
    pub name: String,
    #[serde(rename = "hldg_qty", default)]
    pub amount: String,
    #[serde(rename = "pchs_avg_pric", default)]
    pub average_price: String,
    #[serde(rename = "prpr", default)]
    pub current_price: String,
    #[serde(rename = "evlu_pfls_amt", default)]
    pub unrealized_pnl: String,
    #[serde(rename = "evlu_pfls_rt", default)]
    pub unrealized_pnl_percent: String,
}

/// Raw account summary row (balance output2, first element).
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceSummaryRow {
    #[serde(rename = "tot_evlu_amt", default)]
    pub total: String,
    #[serde(rename = "prvs_rcdl_excc_amt", default)]
    pub free: String,
    #[serde(rename = "dnca_tot_amt", default)]
    pub deposit: String,
    #[serde(rename = "evlu_pfls_smtl_amt", default)]
    pub total_pnl: String,
    #[serde(rename = "asst_icdc_erng_rt", default)]
    pub total_pnl_percent: String,
}
