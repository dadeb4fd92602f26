//! Per-connection runtime: the connection handle and its attribute store, the
//! read/dispatch loop, and the keepalive monitor.

mod attributes;
mod connection;
pub mod keepalive;
mod reader;

use std::fmt;
use std::time::Duration;

use wsocket_core::protocol::{PING_PERIOD, PONG_WAIT, WRITE_WAIT};

pub use attributes::{AttrError, AttrType, AttrValue, Attributes};
pub use connection::{Connection, RequestContext};
pub use reader::run_connection;

/// Keepalive and write timing for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub write_wait: Duration,
    /// Longest silence tolerated before the peer is considered dead.
    pub pong_wait: Duration,
    /// Strictly below `pong_wait`.
    pub ping_period: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            write_wait: WRITE_WAIT,
            pong_wait: PONG_WAIT,
            ping_period: PING_PERIOD,
        }
    }
}

/// Why a server connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer sent a close frame (with its code, if any).
    PeerClosed(Option<u16>),
    /// Stream ended without a close frame.
    StreamEnded,
    /// Nothing (pong included) arrived within the pong wait.
    ReadTimeout,
    ReadError(String),
    PingFailed(String),
    /// Closed locally via [`Connection::close`].
    Cancelled,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed(Some(code)) => write!(f, "peer closed ({code})"),
            CloseReason::PeerClosed(None) => f.write_str("peer closed"),
            CloseReason::StreamEnded => f.write_str("stream ended"),
            CloseReason::ReadTimeout => f.write_str("read deadline exceeded"),
            CloseReason::ReadError(e) => write!(f, "read error: {e}"),
            CloseReason::PingFailed(e) => write!(f, "ping failed: {e}"),
            CloseReason::Cancelled => f.write_str("closed locally"),
        }
    }
}
