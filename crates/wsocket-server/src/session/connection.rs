//! Server-side connection handle.

use std::net::SocketAddr;

use axum::http::{HeaderMap, Uri};
use tokio_util::sync::CancellationToken;

use wsocket_core::error::Result;
use wsocket_core::protocol::{Envelope, Frame};
use wsocket_core::state::{ConnectionState, StateCell};
use wsocket_core::transport::FrameSink;
use wsocket_core::WriteSerializer;

use super::attributes::Attributes;

/// What the upgrade request looked like.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Present when the server runs with connect info.
    pub remote_addr: Option<SocketAddr>,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestContext {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a query parameter, undecoded.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.uri.query()?.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k == name).then_some(v)
        })
    }
}

/// One live socket accepted by the server.
///
/// Owns the write half (through its [`WriteSerializer`]) and the attribute
/// store. The read half belongs to the read loop running for it.
pub struct Connection {
    id: u64,
    request: RequestContext,
    writer: WriteSerializer,
    attrs: Attributes,
    state: StateCell,
    cancel: CancellationToken,
}

impl Connection {
    pub fn new(id: u64, request: RequestContext, sink: FrameSink, write_wait: std::time::Duration) -> Self {
        Self {
            id,
            request,
            writer: WriteSerializer::new(sink, write_wait),
            attrs: Attributes::new(),
            state: StateCell::new(ConnectionState::Connected),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Encode and send one envelope. Write errors go back to the caller.
    pub async fn send_message(&self, env: &Envelope) -> Result<()> {
        self.writer.send_envelope(env).await
    }

    pub async fn send_frame(&self, frame: Frame) -> Result<()> {
        self.writer.send_frame(frame).await
    }

    /// Ask the read loop to stop. Close hooks run and the socket is released
    /// by the loop; use [`Connection::closed`] to wait for that.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Resolves once the socket has been released.
    pub async fn closed(&self) {
        self.state
            .wait_for(|s| s == ConnectionState::Closed)
            .await;
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn state_cell(&self) -> &StateCell {
        &self.state
    }

    pub(crate) fn writer(&self) -> &WriteSerializer {
        &self.writer
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("remote_addr", &self.request.remote_addr)
            .field("state", &self.state.get())
            .finish()
    }
}
