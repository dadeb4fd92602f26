//! Boxed socket halves handed from an endpoint's transport adapter to the
//! shared machinery.

use std::pin::Pin;

use futures_util::{Sink, Stream};

use crate::{error::WsocketError, protocol::Frame, Result};

/// Write half of a socket. Only the [`crate::WriteSerializer`] owns one.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = WsocketError> + Send>>;

/// Read half of a socket. Only the owning read loop polls it.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame>> + Send>>;
