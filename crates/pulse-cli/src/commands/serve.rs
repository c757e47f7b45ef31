//! Server command implementation

use anyhow::{Context, Result};
use pulse_core::Config;

pub async fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    println!("🚀 Starting Pulse web server...");
    match &config.source.database {
        Some(path) => println!("   Warehouse: {}", path.display()),
        None => println!("   Warehouse: (none, serving synthetic data)"),
    }
    println!(
        "   Listening: http://{}:{}",
        config.server.host, config.server.port
    );
    if !config.server.allowed_origins.is_empty() {
        println!("   CORS origins: {}", config.server.allowed_origins.join(", "));
    }

    pulse_server::serve(config)
        .await
        .context("Server exited with an error")
}
