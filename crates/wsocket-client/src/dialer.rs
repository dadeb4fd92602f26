//! Dialers: how the supervisor obtains a fresh socket.

use async_trait::async_trait;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use wsocket_core::error::{Result, WsocketError};
use wsocket_core::transport::{FrameSink, FrameStream};

use crate::codec;
use crate::config::ClientConfig;

/// One dial attempt: complete the handshake or fail.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    async fn dial(&self, cfg: &ClientConfig) -> Result<(FrameSink, FrameStream)>;
}

/// Dials with tokio-tungstenite, attaching the configured handshake headers.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteDialer;

#[async_trait]
impl Dialer for TungsteniteDialer {
    async fn dial(&self, cfg: &ClientConfig) -> Result<(FrameSink, FrameStream)> {
        let mut req = cfg
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| WsocketError::BadRequest(format!("invalid url: {e}")))?;
        for (name, value) in &cfg.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| WsocketError::BadRequest(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| WsocketError::BadRequest(format!("invalid header value: {e}")))?;
            req.headers_mut().insert(name, value);
        }

        let mut ws_cfg = WebSocketConfig::default();
        ws_cfg.write_buffer_size = cfg.write_buffer_size;
        ws_cfg.max_message_size = Some(cfg.max_frame_bytes);
        ws_cfg.max_frame_size = Some(cfg.max_frame_bytes);

        let (socket, _resp) = connect_async_with_config(req, Some(ws_cfg), false)
            .await
            .map_err(WsocketError::transport)?;
        Ok(codec::split(socket))
    }
}
