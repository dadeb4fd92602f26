//! In-memory transports for tests: a sink that records every frame it
//! accepts, and a stream fed from a channel.

#![allow(clippy::unwrap_used)]

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{stream, Sink};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{Result, WsocketError};
use crate::protocol::Frame;
use crate::transport::{FrameSink, FrameStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Accept,
    /// Never becomes ready; every write hits the deadline.
    Stall,
    /// Every write fails.
    Fail,
}

#[derive(Default)]
struct LogInner {
    frames: Vec<Frame>,
    in_flight: bool,
    overlaps: usize,
    closed: bool,
}

/// Shared view of what a [`RecordingSink`] wrote.
#[derive(Clone, Default)]
pub struct WriteLog {
    inner: Arc<Mutex<LogInner>>,
}

impl WriteLog {
    /// Frames whose write completed, in completion order.
    pub fn frames(&self) -> Vec<Frame> {
        self.inner.lock().frames.clone()
    }

    /// Number of times a write began while another was still in flight.
    pub fn overlaps(&self) -> usize {
        self.inner.lock().overlaps
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn pings(&self) -> usize {
        self.frames()
            .iter()
            .filter(|f| matches!(f, Frame::Ping(_)))
            .count()
    }
}

/// Sink that splits every write into a begin (`start_send`) and an end (the
/// flush completes on its second poll), recording the boundaries.
pub struct RecordingSink {
    log: WriteLog,
    mode: Mode,
    pending: Option<Frame>,
    yielded: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::with_mode(Mode::Accept)
    }

    pub fn stalled() -> Self {
        Self::with_mode(Mode::Stall)
    }

    pub fn failing() -> Self {
        Self::with_mode(Mode::Fail)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            log: WriteLog::default(),
            mode,
            pending: None,
            yielded: false,
        }
    }

    pub fn log(&self) -> WriteLog {
        self.log.clone()
    }

    pub fn boxed(self) -> FrameSink {
        Box::pin(self)
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink<Frame> for RecordingSink {
    type Error = WsocketError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        match self.mode {
            Mode::Stall => Poll::Pending,
            _ => Poll::Ready(Ok(())),
        }
    }

    fn start_send(self: Pin<&mut Self>, item: Frame) -> Result<()> {
        let this = self.get_mut();
        if this.mode == Mode::Fail {
            return Err(WsocketError::Transport("broken pipe".into()));
        }
        let mut log = this.log.inner.lock();
        if log.in_flight {
            log.overlaps += 1;
        }
        log.in_flight = true;
        this.pending = Some(item);
        this.yielded = false;
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();
        let Some(frame) = this.pending.take() else {
            return Poll::Ready(Ok(()));
        };
        if !this.yielded {
            // Give other tasks a chance to run mid-write.
            this.yielded = true;
            this.pending = Some(frame);
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        let mut log = this.log.inner.lock();
        log.in_flight = false;
        log.frames.push(frame);
        Poll::Ready(Ok(()))
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let flushed = self.as_mut().poll_flush(cx);
        if flushed.is_ready() {
            self.log.inner.lock().closed = true;
        }
        flushed
    }
}

/// Sending half feeding a [`channel_stream`]. Dropping it ends the stream.
pub type FrameFeed = mpsc::UnboundedSender<Result<Frame>>;

/// A read half whose frames are pushed by the test.
pub fn channel_stream() -> (FrameFeed, FrameStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = stream::unfold(rx, |mut rx| async move {
        let item = rx.recv().await?;
        Some((item, rx))
    });
    (tx, Box::pin(stream))
}
