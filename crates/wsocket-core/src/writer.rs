//! Write serializer.
//!
//! One per connection. Every outbound frame (data, ping, pong, close) goes
//! through [`WriteSerializer::send_frame`], which holds the lock for the whole
//! write so frames from concurrent senders never interleave. Each write runs
//! under a fresh write deadline. [`WriteSerializer::detach`] aborts a write
//! in progress instead of waiting out its deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::SinkExt;
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;

use crate::error::{Result, WsocketError};
use crate::protocol::{Envelope, Frame};
use crate::transport::FrameSink;

pub struct WriteSerializer {
    sink: Mutex<Option<FrameSink>>,
    write_wait: Duration,
    /// Set while `detach` waits for the lock; writers that get it meanwhile
    /// leave the socket alone.
    detaching: AtomicBool,
    abort: Notify,
}

impl WriteSerializer {
    /// Serializer with no socket attached; sends fail with `Disconnected`.
    pub fn detached(write_wait: Duration) -> Self {
        Self {
            sink: Mutex::new(None),
            write_wait,
            detaching: AtomicBool::new(false),
            abort: Notify::new(),
        }
    }

    pub fn new(sink: FrameSink, write_wait: Duration) -> Self {
        Self {
            sink: Mutex::new(Some(sink)),
            write_wait,
            detaching: AtomicBool::new(false),
            abort: Notify::new(),
        }
    }

    pub fn write_wait(&self) -> Duration {
        self.write_wait
    }

    /// Attach a freshly established socket, returning the previous one.
    pub async fn attach(&self, sink: FrameSink) -> Option<FrameSink> {
        self.sink.lock().await.replace(sink)
    }

    /// Release the socket without writing to it. A write in progress, and
    /// any write queued behind it, fails with `Disconnected`.
    pub async fn detach(&self) -> Option<FrameSink> {
        self.detaching.store(true, Ordering::SeqCst);
        self.abort.notify_waiters();
        let sink = self.sink.lock().await.take();
        self.detaching.store(false, Ordering::SeqCst);
        sink
    }

    pub async fn is_attached(&self) -> bool {
        self.sink.lock().await.is_some()
    }

    /// Write one frame. Fails immediately with `Disconnected` when no socket is
    /// attached; fails with `WriteTimeout` when the peer does not accept the
    /// frame within the write deadline.
    pub async fn send_frame(&self, frame: Frame) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let aborted = self.abort.notified();
        tokio::pin!(aborted);
        aborted.as_mut().enable();
        if self.detaching.load(Ordering::SeqCst) {
            return Err(WsocketError::Disconnected);
        }
        let sink = guard.as_mut().ok_or(WsocketError::Disconnected)?;
        tokio::select! {
            biased;
            _ = aborted => Err(WsocketError::Disconnected),
            res = timeout(self.write_wait, sink.send(frame)) => match res {
                Ok(res) => res,
                Err(_) => Err(WsocketError::WriteTimeout),
            },
        }
    }

    /// Encode and write an envelope as a text frame.
    pub async fn send_envelope(&self, env: &Envelope) -> Result<()> {
        let text = env.encode()?;
        self.send_frame(Frame::Text(text)).await
    }

    /// Send a close frame (best effort) and release the socket.
    pub async fn close(&self, code: Option<u16>) -> Result<()> {
        let Some(mut sink) = self.sink.lock().await.take() else {
            return Ok(());
        };
        let res = match timeout(self.write_wait, sink.send(Frame::Close(code))).await {
            Ok(res) => res,
            Err(_) => Err(WsocketError::WriteTimeout),
        };
        let _ = timeout(self.write_wait, sink.close()).await;
        res
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::RecordingSink;

    #[tokio::test]
    async fn send_without_socket_is_disconnected() {
        let w = WriteSerializer::detached(Duration::from_secs(10));
        let start = tokio::time::Instant::now();
        let err = w.send_envelope(&Envelope::new("t", "d")).await.unwrap_err();
        assert_eq!(err.code().as_str(), "DISCONNECTED");
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn concurrent_sends_never_overlap() {
        let sink = RecordingSink::new();
        let log = sink.log();
        let w = Arc::new(WriteSerializer::new(Box::pin(sink), Duration::from_secs(10)));

        let mut tasks = Vec::new();
        for i in 0..32 {
            let w = w.clone();
            tasks.push(tokio::spawn(async move {
                w.send_envelope(&Envelope::new("n", i.to_string())).await
            }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        assert_eq!(log.overlaps(), 0);
        let frames = log.frames();
        assert_eq!(frames.len(), 32);
        for f in frames {
            let Frame::Text(s) = f else { panic!("expected text frame") };
            let env: Envelope = serde_json::from_str(&s).unwrap();
            assert_eq!(env.msg_type, "n");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_peer_hits_write_deadline() {
        let sink = RecordingSink::stalled();
        let w = WriteSerializer::new(Box::pin(sink), Duration::from_secs(10));
        let err = w.send_frame(Frame::ping()).await.unwrap_err();
        assert!(matches!(err, WsocketError::WriteTimeout));
        // Lock was released on the error path.
        let err = w.send_frame(Frame::ping()).await.unwrap_err();
        assert!(matches!(err, WsocketError::WriteTimeout));
    }

    #[tokio::test]
    async fn close_releases_socket() {
        let sink = RecordingSink::new();
        let log = sink.log();
        let w = WriteSerializer::new(Box::pin(sink), Duration::from_secs(10));
        w.close(Some(1000)).await.unwrap();
        assert!(!w.is_attached().await);
        assert_eq!(log.frames(), vec![Frame::normal_close()]);
        assert!(log.is_closed());
        assert!(matches!(
            w.send_frame(Frame::ping()).await,
            Err(WsocketError::Disconnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn detach_cuts_off_stalled_writes() {
        let w = Arc::new(WriteSerializer::new(
            RecordingSink::stalled().boxed(),
            Duration::from_secs(10),
        ));
        let writers: Vec<_> = (0..2)
            .map(|_| {
                let w = w.clone();
                tokio::spawn(async move { w.send_frame(Frame::ping()).await })
            })
            .collect();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let start = tokio::time::Instant::now();
        assert!(w.detach().await.is_some());
        assert!(start.elapsed() < Duration::from_secs(1));
        for t in writers {
            assert!(matches!(t.await.unwrap(), Err(WsocketError::Disconnected)));
        }

        // A socket attached afterwards is written to normally.
        let sink = RecordingSink::new();
        let log = sink.log();
        w.attach(sink.boxed()).await;
        w.send_frame(Frame::pong()).await.unwrap();
        assert_eq!(log.frames(), vec![Frame::pong()]);
    }
}
