//! Endpoint-agnostic message socket interface.

use async_trait::async_trait;

use wsocket_core::error::Result;
use wsocket_core::protocol::Envelope;

use crate::client::WsClient;

/// What an application needs from a client socket: send, receive, close.
#[async_trait]
pub trait MessageSocket: Send + Sync {
    async fn send_message(&self, env: &Envelope) -> Result<()>;
    async fn read_message(&self) -> Result<Envelope>;
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl MessageSocket for WsClient {
    async fn send_message(&self, env: &Envelope) -> Result<()> {
        WsClient::send_message(self, env).await
    }

    async fn read_message(&self) -> Result<Envelope> {
        WsClient::read_message(self).await
    }

    async fn close(&self) -> Result<()> {
        WsClient::close(self).await
    }
}
