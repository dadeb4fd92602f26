//! Shared error type across wsocket crates.

use thiserror::Error;

/// Stable error codes (used in logs and by callers matching on category).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No live socket to write to.
    Disconnected,
    /// Handle or inbound queue closed.
    Closed,
    /// Write deadline elapsed.
    WriteTimeout,
    /// Transport-level failure.
    Transport,
    /// Envelope could not be encoded.
    Encode,
    /// Invalid input / configuration.
    BadRequest,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal failure.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Disconnected => "DISCONNECTED",
            ErrorCode::Closed => "CLOSED",
            ErrorCode::WriteTimeout => "WRITE_TIMEOUT",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Encode => "ENCODE",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, WsocketError>;

/// Unified error type used by core, server and client.
#[derive(Debug, Error)]
pub enum WsocketError {
    #[error("websocket connection disconnected")]
    Disconnected,
    #[error("socket closed")]
    Closed,
    #[error("write deadline exceeded")]
    WriteTimeout,
    #[error("transport: {0}")]
    Transport(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl WsocketError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            WsocketError::Disconnected => ErrorCode::Disconnected,
            WsocketError::Closed => ErrorCode::Closed,
            WsocketError::WriteTimeout => ErrorCode::WriteTimeout,
            WsocketError::Transport(_) => ErrorCode::Transport,
            WsocketError::Encode(_) => ErrorCode::Encode,
            WsocketError::BadRequest(_) => ErrorCode::BadRequest,
            WsocketError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            WsocketError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Wrap any displayable transport error.
    pub fn transport(e: impl std::fmt::Display) -> Self {
        WsocketError::Transport(e.to_string())
    }
}
