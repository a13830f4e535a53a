//! Server event types
//!
//! Event names sent in the `event` field of outbound envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-to-client event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerEventType {
    /// Post-authentication acknowledgment
    Connected,
    /// Sent to the joiner with history after a successful join
    ConversationJoined,
    /// Sent to the leaver acknowledging a leave
    ConversationLeft,
    /// Sent to remaining room subscribers when someone leaves
    UserLeft,
    /// Echo of a persisted message to its sender
    MessageSent,
    /// A persisted message fanned out to the rest of the room
    MessageReceived,
    /// Full typing-user snapshot for a conversation
    TypingUsersUpdated,
    /// A user's presence status changed
    PresenceUpdated,
    /// Any rejection or failure
    Error,
}

impl ServerEventType {
    /// Get the wire name of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::ConversationJoined => "conversation_joined",
            Self::ConversationLeft => "conversation_left",
            Self::UserLeft => "user_left",
            Self::MessageSent => "message_sent",
            Self::MessageReceived => "message_received",
            Self::TypingUsersUpdated => "typing_users_updated",
            Self::PresenceUpdated => "presence_updated",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ServerEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
