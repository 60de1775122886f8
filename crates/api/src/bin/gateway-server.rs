//! Gateway binary entry point.
//!
//! Loads configuration, initializes tracing, starts the process-wide
//! hub and its heartbeat manager, then serves the HTTP/WebSocket
//! surface.

use anyhow::Result;
use clap::Parser;
use gateway_api::GatewayApi;
use gateway_common::GatewayConfig;
use gateway_hub::HeartbeatManager;
use tracing::info;

#[derive(Parser)]
#[command(name = "gateway-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time publish/subscribe coordination hub")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Override the bind host from the config file.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port from the config file.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.as_deref().unwrap_or("info");
    gateway_common::init_tracing_with_level(log_level)?;

    let mut config = GatewayConfig::load_or_default(&cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    info!(host = %config.server.host, port = config.server.port, "configuration loaded");

    let hub = gateway_hub::init(config.hub.clone());
    let heartbeat = HeartbeatManager::new(hub.clone());
    heartbeat.spawn();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let api = GatewayApi::new(hub);
    api.run(&addr).await?;

    heartbeat.shutdown();
    Ok(())
}
