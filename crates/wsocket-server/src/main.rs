//! wsocket server binary.
//!
//! - WebSocket endpoint: `server.ws_path` (default /ws/socket)
//! - Health endpoint: `server.health_path` (default /health)
//! - Demo handler: echo
//!
//! Config is read from `$WSOCKET_CONFIG` (default `wsocket.yaml`); built-in
//! defaults apply when the file does not exist.

use std::path::Path;

use tracing_subscriber::{fmt, EnvFilter};

use wsocket_server::{config, services::EchoService, WsServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var("WSOCKET_CONFIG").unwrap_or_else(|_| "wsocket.yaml".into());
    let cfg = if Path::new(&path).exists() {
        config::load_from_file(&path)?
    } else {
        tracing::info!(%path, "config file not found, using defaults");
        config::ServerConfig::default()
    };

    let server = WsServer::new(cfg, EchoService::new())?;
    let listen = server.state().cfg().server.listen.clone();
    let listener = tokio::net::TcpListener::bind(&listen).await?;

    server
        .serve_with_shutdown(listener, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;
    Ok(())
}
