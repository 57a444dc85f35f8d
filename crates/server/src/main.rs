//! leadflow server binary.
//!
//! Receives voice-AI call webhooks and writes leads to the configured store.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    server::start_server(config).await?;
    Ok(())
}
