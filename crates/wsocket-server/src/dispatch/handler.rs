use std::sync::Arc;

use async_trait::async_trait;

use wsocket_core::protocol::Envelope;

use crate::session::{CloseReason, Connection};

/// Application hooks for server connections, supplied once when the server is
/// built.
///
/// Hooks for one connection are invoked from that connection's task, one at a
/// time: `on_connect` before the first read, `on_message` for every data frame
/// in arrival order, `on_close` exactly once after the read loop stops.
/// `on_message` runs inside the read loop, so a hook that never returns stalls
/// reads (and pong handling) for that connection.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn on_connect(&self, conn: &Arc<Connection>) {
        let _ = conn;
    }

    async fn on_message(&self, conn: &Arc<Connection>, env: Envelope);

    async fn on_close(&self, conn: &Arc<Connection>, reason: &CloseReason) {
        let _ = (conn, reason);
    }
}
