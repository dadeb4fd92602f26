//! Client configuration.

use std::time::Duration;

use wsocket_core::error::{Result, WsocketError};
use wsocket_core::protocol::{MAX_FRAME_BYTES, WRITE_BUFFER_SIZE, WRITE_WAIT};

use crate::queue::DEFAULT_QUEUE_CAPACITY;

/// Fixed delay between dial attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// How the supervisor retries a failed dial.
///
/// The interval is fixed (no backoff growth). `max_attempts: None` retries
/// until the client is closed; `Some(n)` gives up after `n` consecutive failed
/// dials and closes the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            interval: RECONNECT_INTERVAL,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn exhausted(&self, consecutive_failures: u32) -> bool {
        self.max_attempts
            .is_some_and(|max| consecutive_failures >= max)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `ws://` or `wss://` target.
    pub url: String,
    /// Extra handshake headers (name, value).
    pub headers: Vec<(String, String)>,
    pub queue_capacity: usize,
    pub write_wait: Duration,
    pub write_buffer_size: usize,
    pub max_frame_bytes: usize,
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            write_wait: WRITE_WAIT,
            write_buffer_size: WRITE_BUFFER_SIZE,
            max_frame_bytes: MAX_FRAME_BYTES,
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn write_wait(mut self, wait: Duration) -> Self {
        self.write_wait = wait;
        self
    }

    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(WsocketError::BadRequest(format!(
                "url must start with ws:// or wss:// (got {})",
                self.url
            )));
        }
        if self.queue_capacity == 0 {
            return Err(WsocketError::BadRequest("queue_capacity must be at least 1".into()));
        }
        if self.write_wait.is_zero() {
            return Err(WsocketError::BadRequest("write_wait must be non-zero".into()));
        }
        if self.reconnect.interval.is_zero() {
            return Err(WsocketError::BadRequest("reconnect interval must be non-zero".into()));
        }
        if self.reconnect.max_attempts == Some(0) {
            return Err(WsocketError::BadRequest("reconnect max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}
