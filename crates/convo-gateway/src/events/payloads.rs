//! Event payload definitions
//!
//! Wire shapes for each server event. Field names are camelCase on the
//! wire; timestamps serialize as RFC 3339.

use chrono::{DateTime, Utc};
use convo_core::{Message, MessageType, UserIdentity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User data included in events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<UserIdentity> for WireUser {
    fn from(user: UserIdentity) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            avatar: user.avatar,
        }
    }
}

impl From<&UserIdentity> for WireUser {
    fn from(user: &UserIdentity) -> Self {
        Self::from(user.clone())
    }
}

/// `connected` event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// The message a replied-to message points at, with its sender resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireReplyTo {
    pub id: Uuid,
    pub sender: WireUser,
    pub content: String,
}

/// Full message representation fanned out to the room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: WireUser,
    pub content: String,
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<WireReplyTo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl WireMessage {
    /// Assemble the wire shape from a persisted message and its resolved
    /// sender/reply-to identities
    pub fn from_message(message: Message, sender: WireUser, reply_to: Option<WireReplyTo>) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender,
            content: message.content,
            message_type: message.message_type,
            reply_to,
            attachment_url: message.attachment_url,
            attachment_type: message.attachment_type,
            timestamp: message.created_at,
        }
    }
}

/// `conversation_joined` event payload (history is oldest-first)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationJoinedEvent {
    pub conversation_id: Uuid,
    pub messages: Vec<WireMessage>,
}

/// `conversation_left` event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationLeftEvent {
    pub conversation_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// `user_left` event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftEvent {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry of the typing-user snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUser {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl From<UserIdentity> for TypingUser {
    fn from(user: UserIdentity) -> Self {
        Self {
            user_id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// `typing_users_updated` event payload.
///
/// Always the complete current list for the conversation, never a delta,
/// so clients that missed an earlier transition converge on the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUsersEvent {
    pub conversation_id: Uuid,
    pub typing_users: Vec<TypingUser>,
    pub timestamp: DateTime<Utc>,
}

/// `presence_updated` event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdatedEvent {
    pub user_id: Uuid,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// `error` event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
}
