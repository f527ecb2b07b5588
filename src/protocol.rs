//! Wire protocol for the event channel
//!
//! Every WebSocket text frame is a JSON envelope:
//!
//! ```text
//! {"event": "audio_chunk", "data": {"audio": "<base64>", "timestamp": 42}}
//! {"event": "ping"}
//! ```
//!
//! `data` is omitted (or `null`) for events without a payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ProtocolError;

/// Logical identity a client registers under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Producer of audio
    Mobile,
    /// Consumer of audio
    Pc,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mobile => "mobile",
            Role::Pc => "pc",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one transport-level connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable
        let full = self.0.simple().to_string();
        f.write_str(&full[..8])
    }
}

/// One unit of encoded audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioChunk {
    /// Opaque encoded blob, base64 text as sent by the browser
    pub audio: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl AudioChunk {
    pub fn new(audio: impl Into<String>, timestamp: i64) -> Self {
        Self {
            audio: audio.into(),
            timestamp,
        }
    }
}

/// Attachment state of both roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub mobile_connected: bool,
    pub pc_connected: bool,
}

/// Raw `audio_chunk` payload; `audio` is validated by the dispatcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AudioChunkPayload {
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    RegisterMobile,
    RegisterPc,
    AudioChunk(AudioChunkPayload),
    GetBuffer,
    ClearBuffer,
    Ping,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl ClientMessage {
    /// Decode one text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidFrame(e.to_string()))?;

        match envelope.event.as_str() {
            "register_mobile" => Ok(ClientMessage::RegisterMobile),
            "register_pc" => Ok(ClientMessage::RegisterPc),
            "audio_chunk" => {
                let payload = match envelope.data {
                    None | Some(serde_json::Value::Null) => AudioChunkPayload::default(),
                    Some(data) => serde_json::from_value(data)
                        .map_err(|e| ProtocolError::InvalidFrame(e.to_string()))?,
                };
                Ok(ClientMessage::AudioChunk(payload))
            }
            "get_buffer" => Ok(ClientMessage::GetBuffer),
            "clear_buffer" => Ok(ClientMessage::ClearBuffer),
            "ping" => Ok(ClientMessage::Ping),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Event name as it appears on the wire
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::RegisterMobile => "register_mobile",
            ClientMessage::RegisterPc => "register_pc",
            ClientMessage::AudioChunk(_) => "audio_chunk",
            ClientMessage::GetBuffer => "get_buffer",
            ClientMessage::ClearBuffer => "clear_buffer",
            ClientMessage::Ping => "ping",
        }
    }
}

/// Events sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Forwarded chunk for the pc
    AudioToPc(AudioChunk),
    StatusUpdate(DeviceStatus),
    /// `role` is `None` for a connection that never registered
    DeviceDisconnected { role: Option<Role> },
    BufferCleared,
    Pong,
    /// Reply to `get_buffer`
    Buffer { buffer: Vec<AudioChunk> },
    /// Reply to a rejected event
    Error { message: String },
}

impl ServerMessage {
    pub fn error(err: &ProtocolError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }

    /// Event name as it appears on the wire
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::AudioToPc(_) => "audio_to_pc",
            ServerMessage::StatusUpdate(_) => "status_update",
            ServerMessage::DeviceDisconnected { .. } => "device_disconnected",
            ServerMessage::BufferCleared => "buffer_cleared",
            ServerMessage::Pong => "pong",
            ServerMessage::Buffer { .. } => "buffer",
            ServerMessage::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> String {
        // Every variant holds only strings, integers and bools
        serde_json::to_string(self).unwrap_or_default()
    }
}
