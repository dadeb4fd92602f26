//! Connection state machine.
//!
//! `Disconnected -> Connecting -> Connected -> Closing -> Closed`. A client
//! falls back to `Disconnected` after a dropped connection and re-enters
//! `Connecting` on its own; nothing leaves `Closed`.

use std::fmt;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Closing or closed: the handle will never carry a live socket again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Closed, _) => false,
            (Closing, Closed) => true,
            (Closing, _) => false,
            (_, Closing) | (_, Closed) => true,
            (Disconnected, Connecting)
            | (Connecting, Connected)
            | (Connecting, Disconnected)
            | (Connected, Disconnected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// The single authoritative state field of a connection handle.
///
/// Backed by a `watch` channel so that readers never observe the state without
/// synchronization and tests can await a particular state.
#[derive(Debug)]
pub struct StateCell {
    tx: watch::Sender<ConnectionState>,
}

impl StateCell {
    pub fn new(initial: ConnectionState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Apply `next` if the state machine allows it. Returns whether the state
    /// changed.
    pub fn transition(&self, next: ConnectionState) -> bool {
        self.tx.send_if_modified(|cur| {
            if !cur.can_transition_to(next) {
                return false;
            }
            tracing::debug!(from = %cur, to = %next, "connection state");
            *cur = next;
            true
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Wait until the state satisfies `pred` and return it.
    pub async fn wait_for(
        &self,
        mut pred: impl FnMut(ConnectionState) -> bool,
    ) -> ConnectionState {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let state = match rx.wait_for(|s| pred(*s)).await {
            Ok(s) => *s,
            Err(_) => self.get(),
        };
        state
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}
