use serde_json::{json, Value};
use time::macros::format_description;
use time::Date;

use openkis_core::models::parse_kis_date;
use openkis_core::{Granularity, KisClient};

use crate::cli::OhlcvArgs;
use crate::error::CliError;

pub async fn run(client: &KisClient, args: &OhlcvArgs) -> Result<Value, CliError> {
    let granularity: Granularity = args.granularity.parse()?;

    match (&args.from, &args.to) {
        (Some(from), Some(to)) => {
            let start = parse_date(from)?;
            let end = parse_date(to)?;
            let series = client
                .fetch_ohlcv_range(&args.symbol, start, end, granularity)
                .await?;

            Ok(json!({
                "symbol": args.symbol,
                "granularity": granularity,
                "partial": series.is_partial(),
                "candles": series.candles,
                "gaps": series
                    .gaps
                    .iter()
                    .map(|gap| {
                        json!({
                            "start": gap.window.start.to_string(),
                            "end": gap.window.end.to_string(),
                            "error": gap.error.to_string(),
                        })
                    })
                    .collect::<Vec<_>>(),
                "no_data": series
                    .no_data
                    .iter()
                    .map(|region| {
                        json!({
                            "start": region.window.start.to_string(),
                            "end": region.window.end.to_string(),
                            "expected": region.expected,
                            "received": region.received,
                        })
                    })
                    .collect::<Vec<_>>(),
            }))
        }
        _ => {
            let candles = client
                .fetch_ohlcv(&args.symbol, granularity, args.limit)
                .await?;
            Ok(json!({
                "symbol": args.symbol,
                "granularity": granularity,
                "candles": candles,
            }))
        }
    }
}

fn parse_date(raw: &str) -> Result<Date, CliError> {
    let dashed = format_description!("[year]-[month]-[day]");
    Date::parse(raw.trim(), &dashed)
        .ok()
        .or_else(|| parse_kis_date(raw))
        .ok_or_else(|| CliError::InvalidArgument(format!("unrecognized date '{raw}'")))
}
