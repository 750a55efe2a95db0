//! `colloquy serve`: Start the HTTP API server.

use colloquy_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Colloquy Gateway");
    println!("   Listening:      {}:{}", config.gateway.host, config.gateway.port);
    println!("   Auth:           {}", if config.auth.enabled { "enabled" } else { "disabled" });
    println!("   Context tokens: {}", config.context.default_max_tokens);

    colloquy_gateway::start(config).await?;

    Ok(())
}
