//! wsocket server library entry.
//!
//! This crate wires the upgrade endpoint, the per-connection runtime (read
//! loop, keepalive, write serializer, attribute store) and the application's
//! [`dispatch::ConnectionHandler`] into one server. It is consumed by the
//! binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod ops;
pub mod router;
pub mod server;
pub mod services;
pub mod session;
pub mod transport;

pub use dispatch::ConnectionHandler;
pub use server::WsServer;
pub use session::{CloseReason, Connection};
