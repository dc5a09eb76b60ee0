use serde_json::Value;

use openkis_core::KisClient;

use crate::error::CliError;

pub async fn run(client: &KisClient) -> Result<Value, CliError> {
    let balance = client.fetch_balance().await?;
    Ok(serde_json::to_value(balance)?)
}
