use clap::{Args, Parser, Subcommand};

/// Command-line client for the KIS open API.
///
/// Credentials come from the environment: `OPENKIS_APP_KEY`,
/// `OPENKIS_APP_SECRET` and `OPENKIS_ACCOUNT` (format `12345678-01`).
/// `OPENKIS_TOKEN_PATH` overrides the token cache location.
#[derive(Debug, Parser)]
#[command(name = "openkis", version, about)]
pub struct Cli {
    /// Use the paper-trading environment instead of live.
    #[arg(long, global = true)]
    pub paper: bool,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Snapshot quote for one symbol.
    Ticker(SymbolArgs),
    /// Ten-level order book for one symbol.
    Orderbook(SymbolArgs),
    /// Historical candles, optionally over an explicit date range.
    Ohlcv(OhlcvArgs),
    /// Account valuation and held positions.
    Balance,
    /// Orders still open.
    Orders,
}

#[derive(Debug, Args)]
pub struct SymbolArgs {
    /// KRX issue code, e.g. 005930.
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct OhlcvArgs {
    /// KRX issue code, e.g. 005930.
    pub symbol: String,

    /// Candle granularity: 1d, 1w or 1M.
    #[arg(long, default_value = "1d")]
    pub granularity: String,

    /// Range start, `YYYY-MM-DD` or `YYYYMMDD`. Requires --to.
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Range end, `YYYY-MM-DD` or `YYYYMMDD`. Requires --from.
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Newest rows to keep when no range is given.
    #[arg(long, default_value_t = 30)]
    pub limit: usize,
}
