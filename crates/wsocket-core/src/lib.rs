//! wsocket core: envelope codec, transport-neutral frames, connection state,
//! and the write serializer shared by the server and client endpoints.
//!
//! Nothing here knows about axum or tungstenite. Each endpoint crate adapts its
//! socket into a [`transport::FrameSink`] / [`transport::FrameStream`] pair and
//! hands that to the pieces in this crate.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `WsocketError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;
pub mod state;
pub mod transport;
pub mod writer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Shared result type.
pub use error::{Result, WsocketError};
pub use protocol::{Envelope, Frame};
pub use state::ConnectionState;
pub use writer::WriteSerializer;
