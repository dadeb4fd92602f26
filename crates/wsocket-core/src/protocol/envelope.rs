//! Envelope (JSON text frame).
//!
//! Wire shape: `{"type": "...", "to_user_id": 0, "room_id": "", "data": ""}`.
//! Every field is always written; on receipt missing fields default and
//! unknown fields are ignored. Only a JSON object decodes as an envelope.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WsocketError};

/// The structured unit exchanged between peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    /// Discriminator (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Routing target; `0` when unset.
    pub to_user_id: i64,
    /// Routing scope; empty when unset.
    pub room_id: String,
    /// Opaque payload.
    pub data: String,
}

impl Envelope {
    pub fn new(msg_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn to_user(mut self, user_id: i64) -> Self {
        self.to_user_id = user_id;
        self
    }

    pub fn in_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = room_id.into();
        self
    }

    /// Envelope carrying only a raw payload. Used when an inbound frame does not
    /// parse as an envelope.
    pub fn raw(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WsocketError::Encode(e.to_string()))
    }

    /// Decode a text payload. Never fails: a payload that is not a valid
    /// envelope comes back as [`Envelope::raw`] holding the text verbatim.
    pub fn decode_lossy(text: &str) -> Self {
        match Self::decode_object(text.as_bytes()) {
            Some(env) => env,
            None => Self::raw(text),
        }
    }

    /// Same as [`Envelope::decode_lossy`] for binary payloads.
    pub fn decode_bytes_lossy(bytes: &[u8]) -> Self {
        match Self::decode_object(bytes) {
            Some(env) => env,
            None => Self::raw(String::from_utf8_lossy(bytes)),
        }
    }

    // The derived visitor also accepts a sequence, filling fields by position.
    fn decode_object(bytes: &[u8]) -> Option<Self> {
        let first = bytes
            .iter()
            .find(|b| !matches!(**b, b' ' | b'\t' | b'\n' | b'\r'));
        if first != Some(&b'{') {
            tracing::trace!("payload is not a json object, keeping raw");
            return None;
        }
        match serde_json::from_slice(bytes) {
            Ok(env) => Some(env),
            Err(e) => {
                tracing::trace!(error = %e, "payload is not an envelope, keeping raw");
                None
            }
        }
    }
}
