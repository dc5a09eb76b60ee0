mod balance;
mod ohlcv;
mod orderbook;
mod orders;
mod ticker;

use serde_json::Value;

use openkis_core::{AccountNumber, ClientConfig, Credential, Environment, KisClient};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let client = client_from_env(cli.paper)?;

    match &cli.command {
        Command::Ticker(args) => ticker::run(&client, &args.symbol).await,
        Command::Orderbook(args) => orderbook::run(&client, &args.symbol).await,
        Command::Ohlcv(args) => ohlcv::run(&client, args).await,
        Command::Balance => balance::run(&client).await,
        Command::Orders => orders::run(&client).await,
    }
}

fn client_from_env(paper: bool) -> Result<KisClient, CliError> {
    let environment = if paper {
        Environment::Paper
    } else {
        Environment::Live
    };

    let app_key = require_env("OPENKIS_APP_KEY")?;
    let app_secret = require_env("OPENKIS_APP_SECRET")?;
    let account: AccountNumber = require_env("OPENKIS_ACCOUNT")?.parse()?;

    let mut config = ClientConfig::new(Credential::new(app_key, app_secret, environment), account);
    if let Ok(path) = std::env::var("OPENKIS_TOKEN_PATH") {
        config = config.with_token_path(path);
    }

    Ok(KisClient::new(config))
}

fn require_env(name: &'static str) -> Result<String, CliError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(CliError::MissingEnv(name))
}
