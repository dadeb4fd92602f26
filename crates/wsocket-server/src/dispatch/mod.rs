//! Connection event hooks.

pub mod handler;

pub use handler::ConnectionHandler;
