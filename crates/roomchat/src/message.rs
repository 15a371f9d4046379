//! Chat payloads on the wire and entries in the message log
//!
//! The wire format is a UTF-8 JSON object `{"name": .., "text": ..}`. Peers
//! are free to leave fields out, so decoding is lenient about absence but
//! strict about types.

use chrono::{DateTime, Utc};
use roomchat_gossip::PeerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Display name used when a payload carries none
pub const ANONYMOUS: &str = "anonymous";

/// Errors from the wire codec
#[derive(Debug, Error)]
pub enum CodecError {
    /// Not JSON, not an object, or a field of the wrong type
    #[error("malformed chat payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A chat message as carried between peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender's self-chosen display name; unauthenticated
    pub name: String,
    /// Message body; absent when the sender omitted it
    pub text: Option<String>,
}

/// What actually arrives: every field optional
#[derive(Deserialize)]
struct WirePayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl ChatMessage {
    /// Create an outgoing message
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
        }
    }

    /// Serialize to JSON bytes
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse JSON bytes received from a peer
    ///
    /// An absent, null or empty `name` becomes [`ANONYMOUS`].
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let payload: WirePayload = serde_json::from_slice(bytes)?;
        Ok(Self {
            name: display_name(payload.name.as_deref()),
            text: payload.text,
        })
    }
}

/// Encode `{name, text}` for broadcast
pub fn encode(name: &str, text: &str) -> Result<Vec<u8>, CodecError> {
    ChatMessage::new(name, text).encode()
}

/// Decode a received payload
pub fn decode(bytes: &[u8]) -> Result<ChatMessage, CodecError> {
    ChatMessage::decode(bytes)
}

/// The name shown for a sender, falling back to [`ANONYMOUS`]
pub fn display_name(name: Option<&str>) -> String {
    match name {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => ANONYMOUS.to_string(),
    }
}

/// One line of the message log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    /// Sender's display name, never empty
    pub name: String,
    /// Message body
    pub text: Option<String>,
    /// Peer that delivered the message (ourselves for local echoes)
    pub from: PeerId,
    /// When the entry was added locally
    pub received_at: DateTime<Utc>,
    /// Whether we sent it
    pub local: bool,
}

impl ChatEntry {
    /// Entry for a message received from `from`
    pub fn received(message: ChatMessage, from: PeerId) -> Self {
        Self {
            name: message.name,
            text: message.text,
            from,
            received_at: Utc::now(),
            local: false,
        }
    }

    /// Entry for a message we just broadcast
    pub fn sent(name: &str, text: &str, own_id: PeerId) -> Self {
        Self {
            name: display_name(Some(name)),
            text: Some(text.to_string()),
            from: own_id,
            received_at: Utc::now(),
            local: true,
        }
    }

    /// Body for display; empty when absent
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}
