//! Database models - SQLx-compatible structs for PostgreSQL tables

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use convo_core::entities::{Message, Participant, UserIdentity};

/// Row shape for identity lookups against the users table
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

impl From<UserRow> for UserIdentity {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            avatar: row.avatar,
        }
    }
}

/// Row shape for the conversation_participants table
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRow {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub is_muted: bool,
    pub last_read_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Self {
            conversation_id: row.conversation_id,
            user_id: row.user_id,
            role: row.role.parse().unwrap_or_default(),
            is_muted: row.is_muted,
            last_read_at: row.last_read_at,
            joined_at: row.joined_at,
        }
    }
}

/// Row shape for the messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub reply_to_id: Option<Uuid>,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            content: row.content,
            message_type: row.message_type.parse().unwrap_or_default(),
            reply_to_id: row.reply_to_id,
            attachment_url: row.attachment_url,
            attachment_type: row.attachment_type,
            created_at: row.created_at,
        }
    }
}
