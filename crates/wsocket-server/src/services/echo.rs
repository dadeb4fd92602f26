use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use wsocket_core::protocol::Envelope;

use crate::dispatch::ConnectionHandler;
use crate::session::{CloseReason, Connection};

/// Demo handler: tags each connection with its user (from the `user` query
/// parameter) and echoes every envelope back to the sender.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoService;

impl EchoService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConnectionHandler for EchoService {
    async fn on_connect(&self, conn: &Arc<Connection>) {
        let attrs = conn.attributes();
        if let Some(user) = conn.request().query_param("user") {
            attrs.set("user", user);
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        attrs.set("connected_at", now);
        info!(user = ?attrs.get_string("user"), "client connected");
    }

    async fn on_message(&self, conn: &Arc<Connection>, env: Envelope) {
        debug!(msg_type = %env.msg_type, room = %env.room_id, "echo");
        if let Err(e) = conn.send_message(&env).await {
            warn!(error = %e, "echo failed");
        }
    }

    async fn on_close(&self, conn: &Arc<Connection>, reason: &CloseReason) {
        let since = conn.attributes().get_int64("connected_at").unwrap_or_default();
        info!(%reason, connected_at = since, "client disconnected");
    }
}
