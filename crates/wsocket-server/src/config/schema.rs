use std::time::Duration;

use serde::Deserialize;
use wsocket_core::error::{Result, WsocketError};
use wsocket_core::protocol::{MAX_FRAME_BYTES, WRITE_BUFFER_SIZE};

use crate::session::Timing;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WsocketError::UnsupportedVersion);
        }

        self.server.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_write_wait_ms")]
    pub write_wait_ms: u64,

    #[serde(default = "default_pong_wait_ms")]
    pub pong_wait_ms: u64,

    /// Defaults to 0.9 × `pong_wait_ms`.
    #[serde(default)]
    pub ping_period_ms: Option<u64>,

    #[serde(default = "default_write_buffer_size")]
    pub write_buffer_size: usize,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ws_path: default_ws_path(),
            health_path: default_health_path(),
            write_wait_ms: default_write_wait_ms(),
            pong_wait_ms: default_pong_wait_ms(),
            ping_period_ms: None,
            write_buffer_size: default_write_buffer_size(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl ServerSection {
    pub fn ping_period_ms(&self) -> u64 {
        self.ping_period_ms
            .unwrap_or(self.pong_wait_ms * 9 / 10)
    }

    pub fn timing(&self) -> Timing {
        Timing {
            write_wait: Duration::from_millis(self.write_wait_ms),
            pong_wait: Duration::from_millis(self.pong_wait_ms),
            ping_period: Duration::from_millis(self.ping_period_ms()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.ws_path.starts_with('/') || !self.health_path.starts_with('/') {
            return Err(WsocketError::BadRequest(
                "server.ws_path and server.health_path must start with '/'".into(),
            ));
        }
        if self.ws_path == self.health_path {
            return Err(WsocketError::BadRequest(
                "server.ws_path and server.health_path must differ".into(),
            ));
        }
        if !(1000..=60000).contains(&self.write_wait_ms) {
            return Err(WsocketError::BadRequest(
                "server.write_wait_ms must be between 1000 and 60000".into(),
            ));
        }
        if !(2000..=600000).contains(&self.pong_wait_ms) {
            return Err(WsocketError::BadRequest(
                "server.pong_wait_ms must be between 2000 and 600000".into(),
            ));
        }
        let ping = self.ping_period_ms();
        if ping == 0 || ping >= self.pong_wait_ms {
            return Err(WsocketError::BadRequest(
                "server.ping_period_ms must be non-zero and less than pong_wait_ms".into(),
            ));
        }
        if self.write_buffer_size == 0 {
            return Err(WsocketError::BadRequest(
                "server.write_buffer_size must be non-zero".into(),
            ));
        }
        if !(1024..=16 * 1024 * 1024).contains(&self.max_frame_bytes) {
            return Err(WsocketError::BadRequest(
                "server.max_frame_bytes must be between 1024 and 16777216".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ws_path() -> String {
    "/ws/socket".into()
}
fn default_health_path() -> String {
    "/health".into()
}
fn default_write_wait_ms() -> u64 {
    10000
}
fn default_pong_wait_ms() -> u64 {
    60000
}
fn default_write_buffer_size() -> usize {
    WRITE_BUFFER_SIZE
}
fn default_max_frame_bytes() -> usize {
    MAX_FRAME_BYTES
}
