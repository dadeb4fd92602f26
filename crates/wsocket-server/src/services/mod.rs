//! Built-in connection handlers.

pub mod echo;

pub use echo::EchoService;
