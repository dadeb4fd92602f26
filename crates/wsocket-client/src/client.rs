//! WebSocket client with a reconnect supervisor.
//!
//! Lifecycle:
//! - `connect` spawns the supervisor and returns immediately
//! - the supervisor dials until it succeeds (fixed delay between attempts),
//!   attaches the socket to the write serializer and runs exactly one read
//!   loop for it
//! - the read loop feeds the bounded inbound queue; an abnormal drop hands
//!   control back to the supervisor, which redials; a normal closure closes
//!   the queue and ends the client
//! - `close` cancels the supervisor (no new dial after that), sends a normal
//!   close frame and closes the queue

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn, Instrument};

use wsocket_core::error::{Result, WsocketError};
use wsocket_core::protocol::{Envelope, Frame, NORMAL_CLOSURE};
use wsocket_core::state::{ConnectionState, StateCell};
use wsocket_core::transport::{FrameSink, FrameStream};
use wsocket_core::WriteSerializer;

use crate::config::ClientConfig;
use crate::dialer::{Dialer, TungsteniteDialer};
use crate::queue::InboundQueue;

pub struct WsClient {
    inner: Arc<ClientInner>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

struct ClientInner {
    cfg: ClientConfig,
    dialer: Arc<dyn Dialer>,
    writer: WriteSerializer,
    queue: InboundQueue,
    state: StateCell,
    cancel: CancellationToken,
    dial_attempts: AtomicU64,
    connections: AtomicU64,
}

/// Why a read loop returned.
#[derive(Debug)]
enum ReadExit {
    /// Peer sent close code 1000.
    NormalClosure,
    /// Client closed locally.
    Cancelled,
    /// Anything else: the supervisor redials.
    Dropped(String),
}

impl WsClient {
    /// Client using the tokio-tungstenite dialer.
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        Self::with_dialer(cfg, Arc::new(TungsteniteDialer))
    }

    pub fn with_dialer(cfg: ClientConfig, dialer: Arc<dyn Dialer>) -> Result<Self> {
        cfg.validate()?;
        let inner = ClientInner {
            writer: WriteSerializer::detached(cfg.write_wait),
            queue: InboundQueue::new(cfg.queue_capacity),
            state: StateCell::default(),
            cancel: CancellationToken::new(),
            dial_attempts: AtomicU64::new(0),
            connections: AtomicU64::new(0),
            dialer,
            cfg,
        };
        Ok(Self {
            inner: Arc::new(inner),
            supervisor: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.cfg
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    pub fn subscribe_state(&self) -> tokio::sync::watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Dial attempts made so far, successful or not.
    pub fn dial_attempts(&self) -> u64 {
        self.inner.dial_attempts.load(Ordering::Relaxed)
    }

    /// Connections established so far (one read loop each).
    pub fn connections_established(&self) -> u64 {
        self.inner.connections.load(Ordering::Relaxed)
    }

    /// Envelopes dropped because the inbound queue was full.
    pub fn dropped_messages(&self) -> u64 {
        self.inner.queue.evicted()
    }

    /// Start the supervisor in the background. Returns immediately; calling it
    /// again while the supervisor runs is a no-op.
    pub async fn connect(&self) -> Result<()> {
        if self.inner.state.get().is_terminal() {
            return Err(WsocketError::Closed);
        }
        let mut supervisor = self.supervisor.lock().await;
        if supervisor.as_ref().is_some_and(|h| !h.is_finished()) {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        let span = tracing::info_span!("ws_client", url = %inner.cfg.url);
        *supervisor = Some(tokio::spawn(supervise(inner).instrument(span)));
        Ok(())
    }

    /// Wait until a socket is live. Fails with `Closed` if the client reaches a
    /// terminal state first.
    pub async fn wait_connected(&self) -> Result<()> {
        let state = self
            .inner
            .state
            .wait_for(|s| s.is_connected() || s.is_terminal())
            .await;
        if state.is_connected() {
            Ok(())
        } else {
            Err(WsocketError::Closed)
        }
    }

    /// Encode and send one envelope. Fails with `Disconnected` when no socket
    /// is live (for example mid-reconnect); never retried here.
    pub async fn send_message(&self, env: &Envelope) -> Result<()> {
        self.inner.writer.send_envelope(env).await
    }

    /// Next inbound envelope, waiting if none is queued. Fails with `Closed`
    /// once the queue is closed and drained.
    pub async fn read_message(&self) -> Result<Envelope> {
        self.inner.queue.pop().await
    }

    /// Stop reconnecting, send a normal close frame if a socket is live, and
    /// close the inbound queue. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if !self.inner.state.transition(ConnectionState::Closing) {
            return Ok(());
        }
        self.inner.cancel.cancel();

        if let Some(handle) = self.supervisor.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "supervisor task failed");
            }
        }

        let res = self.inner.writer.close(Some(NORMAL_CLOSURE)).await;
        self.inner.queue.close();
        self.inner.state.transition(ConnectionState::Closed);
        info!(url = %self.inner.cfg.url, "client closed");
        res
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

async fn supervise(inner: Arc<ClientInner>) {
    loop {
        let Some((sink, stream)) = dial_until_connected(&inner).await else {
            return;
        };

        inner.writer.attach(sink).await;
        if !inner.state.transition(ConnectionState::Connected) {
            // Closed while the handshake was completing.
            return;
        }
        let n = inner.connections.fetch_add(1, Ordering::Relaxed) + 1;
        info!(connection = n, "connected");

        match read_loop(&inner, stream).await {
            ReadExit::NormalClosure => {
                info!("peer closed the connection");
                inner.writer.detach().await;
                inner.state.transition(ConnectionState::Closing);
                inner.state.transition(ConnectionState::Closed);
                return;
            }
            ReadExit::Cancelled => return,
            ReadExit::Dropped(reason) => {
                warn!(%reason, "socket error, will retry");
                inner.writer.detach().await;
                inner.state.transition(ConnectionState::Disconnected);
            }
        }
    }
}

/// Dial until a handshake succeeds. `None` when the client was closed or the
/// reconnect policy gave up.
async fn dial_until_connected(inner: &ClientInner) -> Option<(FrameSink, FrameStream)> {
    let policy = &inner.cfg.reconnect;
    let mut failures: u32 = 0;

    loop {
        if inner.cancel.is_cancelled() {
            return None;
        }
        inner.state.transition(ConnectionState::Connecting);
        inner.dial_attempts.fetch_add(1, Ordering::Relaxed);

        let res = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => return None,
            res = inner.dialer.dial(&inner.cfg) => res,
        };

        let err = match res {
            Ok(halves) => return Some(halves),
            Err(e) => e,
        };

        failures = failures.saturating_add(1);
        warn!(error = %err, url = %inner.cfg.url, attempt = failures, "dial failed");
        inner.state.transition(ConnectionState::Disconnected);

        if policy.exhausted(failures) {
            error!(url = %inner.cfg.url, attempts = failures, "giving up reconnecting");
            inner.queue.close();
            inner.state.transition(ConnectionState::Closing);
            inner.state.transition(ConnectionState::Closed);
            return None;
        }

        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => return None,
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }
}

async fn read_loop(inner: &ClientInner, mut stream: FrameStream) -> ReadExit {
    loop {
        let next = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => {
                inner.queue.close();
                return ReadExit::Cancelled;
            }
            next = stream.next() => next,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return ReadExit::Dropped(e.to_string()),
            None => return ReadExit::Dropped("stream ended without close frame".into()),
        };

        match frame {
            Frame::Ping(_) => {
                if let Err(e) = inner.writer.send_frame(Frame::pong()).await {
                    debug!(error = %e, "pong write failed");
                }
            }
            Frame::Pong(_) => trace!("pong"),
            Frame::Text(text) => inner.queue.push(Envelope::decode_lossy(&text)),
            Frame::Binary(bytes) => inner.queue.push(Envelope::decode_bytes_lossy(&bytes)),
            Frame::Close(Some(NORMAL_CLOSURE)) => {
                inner.queue.close();
                return ReadExit::NormalClosure;
            }
            Frame::Close(code) => {
                return ReadExit::Dropped(format!("peer closed with code {code:?}"));
            }
        }
    }
}
