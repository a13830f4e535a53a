//! Client event payload definitions

use convo_core::MessageType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::presence::PresenceStatus;

/// `join_conversation` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinConversationPayload {
    pub conversation_id: Uuid,
}

/// `leave_conversation` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveConversationPayload {
    pub conversation_id: Uuid,
}

/// `send_message` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub conversation_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub message_type: Option<MessageType>,
    #[serde(default)]
    pub reply_to_id: Option<Uuid>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub attachment_type: Option<String>,
}

impl SendMessagePayload {
    /// Create a plain text payload (test helper used across the workspace)
    pub fn text(conversation_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            conversation_id,
            content: content.into(),
            message_type: None,
            reply_to_id: None,
            attachment_url: None,
            attachment_type: None,
        }
    }

    /// Check if any attachment field is present
    #[inline]
    pub fn has_attachment_fields(&self) -> bool {
        self.attachment_url.is_some() || self.attachment_type.is_some()
    }
}

/// `typing_start` / `typing_stop` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub conversation_id: Uuid,
}

/// `set_presence` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPresencePayload {
    pub status: PresenceStatus,
}
