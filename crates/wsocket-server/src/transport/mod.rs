//! Transport layer (WebSocket).
//!
//! Exposes the upgrade handler and the codec that maps axum messages onto the
//! transport-neutral frames used by the session runtime.

pub mod codec;
pub mod ws;
