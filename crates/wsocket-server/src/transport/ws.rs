//! WebSocket upgrade handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS with the configured size limits
//! - Capture the request context (remote address, URI, headers)
//! - Build the connection, run `on_connect`, then drive the read loop and
//!   keepalive until the connection ends
//!
//! Origin checking is disabled: upgrades from any origin are accepted.
//! Authentication, if any, belongs in middleware layered on the router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocket, ws::WebSocketUpgrade, ConnectInfo, State},
    http::{HeaderMap, Uri},
    response::Response,
};
use tracing::{info, warn, Instrument};

use crate::app_state::AppState;
use crate::session::{run_connection, Connection, RequestContext};
use crate::transport::codec;

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(
    State(app): State<AppState>,
    remote: Option<ConnectInfo<SocketAddr>>,
    uri: Uri,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let request = RequestContext {
        remote_addr: remote.map(|ConnectInfo(addr)| addr),
        uri,
        headers,
    };
    let limits = &app.cfg().server;

    ws.write_buffer_size(limits.write_buffer_size)
        .max_message_size(limits.max_frame_bytes)
        .max_frame_size(limits.max_frame_bytes)
        .on_failed_upgrade(|e| warn!(error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| run_session(app, request, socket))
}

// --------------------
// Session
// --------------------
async fn run_session(app: AppState, request: RequestContext, socket: WebSocket) {
    let id = app.next_connection_id();
    let span = tracing::info_span!("conn", id, remote = ?request.remote_addr);

    async move {
        let timing = app.timing();
        let (sink, stream) = codec::split(socket);
        let conn = Arc::new(Connection::new(id, request, sink, timing.write_wait));
        info!(path = %conn.request().uri.path(), "connection opened");

        let handler = app.handler();
        handler.on_connect(&conn).await;

        let reason = run_connection(conn, stream, handler, timing).await;
        info!(%reason, "connection released");
    }
    .instrument(span)
    .await
}
