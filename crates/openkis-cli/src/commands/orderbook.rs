use serde_json::Value;

use openkis_core::KisClient;

use crate::error::CliError;

pub async fn run(client: &KisClient, symbol: &str) -> Result<Value, CliError> {
    let book = client.fetch_order_book(symbol).await?;
    Ok(serde_json::to_value(book)?)
}
