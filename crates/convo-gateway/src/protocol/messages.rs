//! Message envelope format
//!
//! Every frame on the wire is a JSON object `{"event": ..., "data": ...}`.
//! Inbound frames deserialize straight into the `ClientMessage` enum so
//! unknown events and malformed payloads are rejected in one place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::payloads::{
    JoinConversationPayload, LeaveConversationPayload, SendMessagePayload, SetPresencePayload,
    TypingPayload,
};
use crate::events::ServerEventType;

/// Inbound client event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinConversation(JoinConversationPayload),
    LeaveConversation(LeaveConversationPayload),
    SendMessage(SendMessagePayload),
    TypingStart(TypingPayload),
    TypingStop(TypingPayload),
    SetPresence(SetPresencePayload),
}

impl ClientMessage {
    /// Deserialize from a JSON text frame
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Event name for logging
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::JoinConversation(_) => "join_conversation",
            Self::LeaveConversation(_) => "leave_conversation",
            Self::SendMessage(_) => "send_message",
            Self::TypingStart(_) => "typing_start",
            Self::TypingStop(_) => "typing_stop",
            Self::SetPresence(_) => "set_presence",
        }
    }
}

/// Outbound server event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Event name
    pub event: ServerEventType,

    /// Event data payload
    pub data: Value,
}

impl ServerMessage {
    /// Create a server message from any serializable payload
    #[must_use]
    pub fn new(event: ServerEventType, data: impl Serialize) -> Self {
        Self {
            event,
            data: serde_json::to_value(data).unwrap_or_default(),
        }
    }

    /// Create an `error` event with a user-facing message
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(
            ServerEventType::Error,
            crate::events::ErrorEvent {
                message: message.into(),
            },
        )
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ServerMessage(event={})", self.event)
    }
}
