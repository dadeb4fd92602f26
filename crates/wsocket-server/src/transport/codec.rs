//! Mapping between axum's WebSocket messages and [`Frame`]s.

use std::future;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use wsocket_core::error::WsocketError;
use wsocket_core::protocol::Frame;
use wsocket_core::transport::{FrameSink, FrameStream};

pub fn decode(msg: Message) -> Frame {
    match msg {
        Message::Text(s) => Frame::Text(s),
        Message::Binary(b) => Frame::Binary(b),
        Message::Ping(p) => Frame::Ping(p),
        Message::Pong(p) => Frame::Pong(p),
        Message::Close(cf) => Frame::Close(cf.map(|c| c.code)),
    }
}

pub fn encode(frame: Frame) -> Message {
    match frame {
        Frame::Text(s) => Message::Text(s),
        Frame::Binary(b) => Message::Binary(b),
        Frame::Ping(p) => Message::Ping(p),
        Frame::Pong(p) => Message::Pong(p),
        Frame::Close(code) => Message::Close(code.map(|code| CloseFrame {
            code,
            reason: "".into(),
        })),
    }
}

/// Split an upgraded socket into the write half (for the connection's write
/// serializer) and the read half (for its read loop).
pub fn split(socket: WebSocket) -> (FrameSink, FrameStream) {
    let (tx, rx) = socket.split();
    let sink = tx
        .sink_map_err(WsocketError::transport)
        .with(|f: Frame| future::ready(Ok::<_, WsocketError>(encode(f))));
    let stream = rx.map(|res| res.map(decode).map_err(WsocketError::transport));
    (Box::pin(sink), Box::pin(stream))
}
