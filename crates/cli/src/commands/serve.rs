//! `aura serve` — start the HTTP API server.

use tracing::info;

pub async fn run(
    config_path: Option<&str>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        "Starting Aura"
    );
    aura_gateway::serve(config).await
}
