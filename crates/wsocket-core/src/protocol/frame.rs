//! Transport-neutral frame model.
//!
//! Both axum's and tungstenite's message types are mapped onto [`Frame`] at the
//! socket boundary so the read loops, keepalive and write serializer are
//! written once.

use super::NORMAL_CLOSURE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// Close frame with its status code, if the peer sent one.
    Close(Option<u16>),
}

impl Frame {
    pub fn ping() -> Self {
        Frame::Ping(Vec::new())
    }

    pub fn pong() -> Self {
        Frame::Pong(Vec::new())
    }

    pub fn normal_close() -> Self {
        Frame::Close(Some(NORMAL_CLOSURE))
    }

    pub fn is_control(&self) -> bool {
        matches!(self, Frame::Ping(_) | Frame::Pong(_) | Frame::Close(_))
    }

    /// True only for a close frame carrying code 1000.
    pub fn is_normal_close(&self) -> bool {
        matches!(self, Frame::Close(Some(NORMAL_CLOSURE)))
    }
}
