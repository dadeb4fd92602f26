//! Server config loader (strict parsing).

pub mod schema;

use std::fs;

use wsocket_core::error::{Result, WsocketError};

pub use schema::{ServerConfig, ServerSection};

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| WsocketError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| WsocketError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
