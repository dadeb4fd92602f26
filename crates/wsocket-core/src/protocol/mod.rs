//! Wire protocol: the JSON envelope carried in data frames, the
//! transport-neutral frame model, and the default timing/size limits both
//! endpoints agree on.

use std::time::Duration;

pub mod envelope;
pub mod frame;

pub use envelope::Envelope;
pub use frame::Frame;

/// Time allowed to write a single frame to the peer.
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Time allowed between two inbound frames (pong included) before the peer is
/// considered dead.
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Ping period. Must stay below [`PONG_WAIT`]; 0.9 × pong wait.
pub const PING_PERIOD: Duration = Duration::from_millis(PONG_WAIT.as_millis() as u64 * 9 / 10);

/// Maximum inbound message size.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Transport write buffer size.
pub const WRITE_BUFFER_SIZE: usize = 1024;

/// Close code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;
