//! wsocket client.
//!
//! A persistent client socket: the supervisor keeps redialing across network
//! failures, inbound envelopes are buffered in a bounded drop-oldest queue,
//! and every write goes through one serializer per connection.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod client;
pub mod codec;
pub mod config;
pub mod dialer;
pub mod queue;
pub mod socket;

pub use client::WsClient;
pub use config::{ClientConfig, ReconnectPolicy};
pub use dialer::{Dialer, TungsteniteDialer};
pub use queue::InboundQueue;
pub use socket::MessageSocket;
