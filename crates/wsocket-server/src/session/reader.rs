//! Server read/dispatch loop and connection teardown.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace, warn, Instrument};

use wsocket_core::protocol::{Envelope, Frame, NORMAL_CLOSURE};
use wsocket_core::state::ConnectionState;
use wsocket_core::transport::FrameStream;

use super::connection::Connection;
use super::keepalive::{self, KeepaliveExit};
use super::{CloseReason, Timing};
use crate::dispatch::ConnectionHandler;

/// Drive one accepted connection until it ends: read loop plus keepalive,
/// then `on_close`, then release the socket.
pub async fn run_connection(
    conn: Arc<Connection>,
    mut stream: FrameStream,
    handler: Arc<dyn ConnectionHandler>,
    timing: Timing,
) -> CloseReason {
    let keepalive = tokio::spawn(
        keepalive::run(Arc::clone(&conn), timing.ping_period).instrument(tracing::Span::current()),
    );

    let reason = read_loop(&conn, &mut stream, handler.as_ref(), timing.pong_wait).await;

    // Keepalive lives exactly as long as the read loop.
    conn.cancel_token().cancel();
    let reason = match keepalive.await {
        Ok(KeepaliveExit::PingFailed(e)) if reason == CloseReason::Cancelled => {
            CloseReason::PingFailed(e)
        }
        _ => reason,
    };

    match &reason {
        CloseReason::ReadTimeout | CloseReason::ReadError(_) | CloseReason::PingFailed(_) => {
            warn!(%reason, "connection terminated")
        }
        _ => info!(%reason, "connection ended"),
    }

    conn.state_cell().transition(ConnectionState::Closing);
    handler.on_close(&conn, &reason).await;

    drop(stream);
    if let Err(e) = conn.writer().close(Some(NORMAL_CLOSURE)).await {
        debug!(error = %e, "close frame not delivered");
    }
    conn.state_cell().transition(ConnectionState::Closed);
    reason
}

async fn read_loop(
    conn: &Arc<Connection>,
    stream: &mut FrameStream,
    handler: &dyn ConnectionHandler,
    pong_wait: Duration,
) -> CloseReason {
    let cancel = conn.cancel_token().clone();
    let mut deadline = Instant::now() + pong_wait;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CloseReason::Cancelled,
            next = timeout_at(deadline, stream.next()) => next,
        };

        let frame = match next {
            Err(_) => return CloseReason::ReadTimeout,
            Ok(None) => return CloseReason::StreamEnded,
            Ok(Some(Err(e))) => return CloseReason::ReadError(e.to_string()),
            Ok(Some(Ok(frame))) => frame,
        };
        deadline = Instant::now() + pong_wait;

        match frame {
            Frame::Ping(_) => {
                if let Err(e) = conn.send_frame(Frame::pong()).await {
                    return CloseReason::ReadError(format!("pong write failed: {e}"));
                }
            }
            Frame::Pong(_) => trace!("pong"),
            Frame::Text(text) => handler.on_message(conn, Envelope::decode_lossy(&text)).await,
            Frame::Binary(bytes) => {
                handler
                    .on_message(conn, Envelope::decode_bytes_lossy(&bytes))
                    .await
            }
            Frame::Close(code) => return CloseReason::PeerClosed(code),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::sleep;
    use wsocket_core::testing::{channel_stream, FrameFeed, RecordingSink, WriteLog};
    use wsocket_core::WsocketError;

    use super::*;
    use crate::session::RequestContext;

    #[derive(Debug, PartialEq)]
    enum Event {
        Message(Envelope),
        Close(CloseReason),
    }

    /// Records events; echoes envelopes of type "echo".
    struct Recorder {
        events: mpsc::UnboundedSender<Event>,
    }

    #[async_trait]
    impl ConnectionHandler for Recorder {
        async fn on_message(&self, conn: &Arc<Connection>, env: Envelope) {
            if env.msg_type == "echo" {
                conn.send_message(&env).await.unwrap();
            }
            if env.msg_type == "quit" {
                conn.close();
            }
            let _ = self.events.send(Event::Message(env));
        }

        async fn on_close(&self, _conn: &Arc<Connection>, reason: &CloseReason) {
            let _ = self.events.send(Event::Close(reason.clone()));
        }
    }

    struct Harness {
        conn: Arc<Connection>,
        feed: FrameFeed,
        log: WriteLog,
        events: mpsc::UnboundedReceiver<Event>,
        task: tokio::task::JoinHandle<CloseReason>,
    }

    fn start_with(sink: RecordingSink) -> Harness {
        let log = sink.log();
        let (feed, stream) = channel_stream();
        let conn = Arc::new(Connection::new(
            1,
            RequestContext::default(),
            sink.boxed(),
            Duration::from_secs(10),
        ));
        let (tx, events) = mpsc::unbounded_channel();
        let handler: Arc<dyn ConnectionHandler> = Arc::new(Recorder { events: tx });
        let task = tokio::spawn(run_connection(conn.clone(), stream, handler, Timing::default()));
        Harness { conn, feed, log, events, task }
    }

    fn start() -> Harness {
        start_with(RecordingSink::new())
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_is_torn_down_after_pong_wait() {
        let mut h = start();
        let begin = Instant::now();

        let reason = h.task.await.unwrap();
        assert_eq!(reason, CloseReason::ReadTimeout);
        let elapsed = begin.elapsed();
        assert!(elapsed >= Duration::from_secs(60), "elapsed={elapsed:?}");
        assert!(elapsed < Duration::from_secs(61), "elapsed={elapsed:?}");

        // One ping went out at 54s; nobody answered.
        assert_eq!(h.log.pings(), 1);
        assert_eq!(h.events.recv().await, Some(Event::Close(CloseReason::ReadTimeout)));
        assert_eq!(h.conn.state(), ConnectionState::Closed);
        assert!(h.log.is_closed());
        drop(h.feed);
    }

    #[tokio::test(start_paused = true)]
    async fn pongs_keep_the_connection_alive() {
        let h = start();
        let begin = Instant::now();
        for _ in 0..3 {
            sleep(Duration::from_secs(54)).await;
            h.feed.send(Ok(Frame::pong())).unwrap();
        }
        assert_eq!(h.conn.state(), ConnectionState::Connected);

        let reason = h.task.await.unwrap();
        assert_eq!(reason, CloseReason::ReadTimeout);
        assert!(begin.elapsed() >= Duration::from_secs(54 * 3 + 60));
        assert!(h.log.pings() >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn ping_is_answered_before_anything_else() {
        let mut h = start();
        h.feed.send(Ok(Frame::ping())).unwrap();
        let echo = Envelope::new("echo", "hi").encode().unwrap();
        h.feed.send(Ok(Frame::Text(echo.clone()))).unwrap();

        assert!(matches!(h.events.recv().await, Some(Event::Message(_))));
        let frames = h.log.frames();
        assert_eq!(frames[0], Frame::pong());
        assert_eq!(frames[1], Frame::Text(echo));
    }

    #[tokio::test(start_paused = true)]
    async fn every_data_frame_reaches_the_handler() {
        let mut h = start();
        h.feed.send(Ok(Frame::Text("{\"type\":\"chat\",\"data\":\"x\"}".into()))).unwrap();
        h.feed.send(Ok(Frame::Text("not json".into()))).unwrap();
        h.feed.send(Ok(Frame::Text(String::new()))).unwrap();
        h.feed.send(Ok(Frame::Binary(b"\xffraw".to_vec()))).unwrap();

        assert_eq!(h.events.recv().await, Some(Event::Message(Envelope::new("chat", "x"))));
        assert_eq!(h.events.recv().await, Some(Event::Message(Envelope::raw("not json"))));
        assert_eq!(h.events.recv().await, Some(Event::Message(Envelope::raw(""))));
        assert_eq!(h.events.recv().await, Some(Event::Message(Envelope::raw("\u{fffd}raw"))));
    }

    #[tokio::test(start_paused = true)]
    async fn peer_close_runs_close_hook() {
        let mut h = start();
        h.feed.send(Ok(Frame::normal_close())).unwrap();
        let reason = h.task.await.unwrap();
        assert_eq!(reason, CloseReason::PeerClosed(Some(1000)));
        assert_eq!(h.events.recv().await, Some(Event::Close(reason)));
        assert_eq!(h.log.pings(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn read_error_runs_close_hook() {
        let mut h = start();
        h.feed.send(Err(WsocketError::Transport("reset".into()))).unwrap();
        let reason = h.task.await.unwrap();
        assert_eq!(reason, CloseReason::ReadError("transport: reset".into()));
        assert_eq!(h.events.recv().await, Some(Event::Close(reason)));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_ping_is_fatal() {
        let mut h = start_with(RecordingSink::failing());
        let begin = Instant::now();
        let reason = h.task.await.unwrap();
        assert!(matches!(reason, CloseReason::PingFailed(_)), "reason={reason:?}");
        assert!(begin.elapsed() < Duration::from_secs(55));
        assert!(matches!(h.events.recv().await, Some(Event::Close(CloseReason::PingFailed(_)))));
    }

    #[tokio::test(start_paused = true)]
    async fn local_close_from_handler() {
        let mut h = start();
        h.feed.send(Ok(Frame::Text(Envelope::new("quit", "").encode().unwrap()))).unwrap();
        let reason = h.task.await.unwrap();
        assert_eq!(reason, CloseReason::Cancelled);
        assert!(matches!(h.events.recv().await, Some(Event::Message(_))));
        assert_eq!(h.events.recv().await, Some(Event::Close(CloseReason::Cancelled)));
        assert_eq!(h.log.frames(), vec![Frame::normal_close()]);
        h.conn.closed().await;
    }
}
