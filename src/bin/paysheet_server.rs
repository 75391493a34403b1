//! Trusted backend for checkout clients

use paysheet::config::{self, ServerConfig};
use paysheet::server::run_server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let server_config = ServerConfig::from_env()?;

    let publishable_key = server_config.client.credentials.publishable_key.clone();
    if !publishable_key.is_empty() {
        config::init_publishable_key(publishable_key)?;
    }

    if !server_config.client.credentials.is_test_mode() {
        tracing::warn!("Running with a live secret key");
    }

    run_server(server_config).await?;

    Ok(())
}
