//! Keepalive monitor: pings the peer on a fixed period for as long as the
//! connection's read loop runs.
//!
//! Dead-peer detection itself happens in the read loop (read deadline); this
//! task only makes sure a live peer has something to answer. A failed ping
//! write is fatal and cancels the connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use wsocket_core::protocol::Frame;

use super::connection::Connection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepaliveExit {
    /// The connection was cancelled (read loop ended or local close).
    Stopped,
    PingFailed(String),
}

pub async fn run(conn: Arc<Connection>, period: Duration) -> KeepaliveExit {
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let cancel = conn.cancel_token().clone();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return KeepaliveExit::Stopped,
            _ = tick.tick() => {
                if let Err(e) = conn.send_frame(Frame::ping()).await {
                    warn!(error = %e, "ping failed, closing connection");
                    cancel.cancel();
                    return KeepaliveExit::PingFailed(e.to_string());
                }
                debug!("ping");
            }
        }
    }
}
