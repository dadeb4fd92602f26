//! Mapping between tungstenite messages and [`Frame`]s.

use std::future;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};

use wsocket_core::error::WsocketError;
use wsocket_core::protocol::Frame;
use wsocket_core::transport::{FrameSink, FrameStream};

/// Raw control frames (`Message::Frame`) never reach the application.
pub fn decode(msg: Message) -> Option<Frame> {
    match msg {
        Message::Text(s) => Some(Frame::Text(s)),
        Message::Binary(b) => Some(Frame::Binary(b)),
        Message::Ping(p) => Some(Frame::Ping(p)),
        Message::Pong(p) => Some(Frame::Pong(p)),
        Message::Close(cf) => Some(Frame::Close(cf.map(|c| u16::from(c.code)))),
        Message::Frame(_) => None,
    }
}

pub fn encode(frame: Frame) -> Message {
    match frame {
        Frame::Text(s) => Message::Text(s),
        Frame::Binary(b) => Message::Binary(b),
        Frame::Ping(p) => Message::Ping(p),
        Frame::Pong(p) => Message::Pong(p),
        Frame::Close(code) => Message::Close(code.map(|c| CloseFrame {
            code: CloseCode::from(c),
            reason: "".into(),
        })),
    }
}

/// Split a connected tungstenite socket into the boxed halves used by the
/// write serializer and the read loop.
pub fn split<S>(socket: S) -> (FrameSink, FrameStream)
where
    S: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Send
        + 'static,
{
    let (tx, rx) = socket.split();
    let sink = tx
        .sink_map_err(WsocketError::transport)
        .with(|f: Frame| future::ready(Ok::<_, WsocketError>(encode(f))));
    let stream = rx.filter_map(|res| {
        future::ready(match res {
            Ok(msg) => decode(msg).map(Ok),
            Err(e) => Some(Err(WsocketError::transport(e))),
        })
    });
    (Box::pin(sink), Box::pin(stream))
}
