//! Participant entity - links a user to a conversation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a participant within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    #[default]
    Member,
    Admin,
    Owner,
}

impl ParticipantRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl std::str::FromStr for ParticipantRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            _ => Err(format!("Invalid participant role: {s}")),
        }
    }
}

/// Authorization record linking a user to a conversation.
///
/// Read-mostly input to the real-time core: fetched on every join and
/// send, never mutated here. Membership can change between connections,
/// which is why it is re-fetched rather than cached on the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub is_muted: bool,
    pub last_read_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    /// Create a new member-role participant
    pub fn new(conversation_id: Uuid, user_id: Uuid) -> Self {
        Self {
            conversation_id,
            user_id,
            role: ParticipantRole::Member,
            is_muted: false,
            last_read_at: None,
            joined_at: Utc::now(),
        }
    }

    /// Check if this participant may moderate the conversation
    #[inline]
    pub fn is_moderator(&self) -> bool {
        matches!(self.role, ParticipantRole::Admin | ParticipantRole::Owner)
    }
}
