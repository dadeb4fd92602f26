//! Top-level facade crate for wsocket.
//!
//! Re-exports the core types, the server and the client so users can depend
//! on a single crate.

pub mod core {
    pub use wsocket_core::*;
}

pub mod server {
    pub use wsocket_server::*;
}

pub mod client {
    pub use wsocket_client::*;
}

pub use wsocket_core::{ConnectionState, Envelope, Result, WsocketError};
