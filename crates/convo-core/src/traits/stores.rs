//! Store traits (ports) - define the interface for data access
//!
//! The real-time core never owns relational state; it consumes these
//! narrow interfaces and lets the infrastructure layer provide the
//! implementation (PostgreSQL in production, in-memory doubles in tests).

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Message, NewMessage, Participant, ReadReceipt, UserIdentity};
use crate::error::DomainError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, DomainError>;

// ============================================================================
// User Store
// ============================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Resolve a user id to its display identity
    async fn find_identity(&self, user_id: Uuid) -> StoreResult<Option<UserIdentity>>;
}

// ============================================================================
// Participant Store
// ============================================================================

#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Fetch the participant record for (conversation, user).
    ///
    /// `None` means the user is not a member of the conversation - callers
    /// treat that as an authorization failure, not an infrastructure one.
    async fn find(&self, conversation_id: Uuid, user_id: Uuid) -> StoreResult<Option<Participant>>;
}

// ============================================================================
// Message Store
// ============================================================================

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message. The store assigns the id and creation
    /// timestamp and returns the full record.
    async fn create(&self, message: NewMessage) -> StoreResult<Message>;

    /// Find a message by id
    async fn find_by_id(&self, message_id: Uuid) -> StoreResult<Option<Message>>;

    /// Most recent messages in a conversation, newest first, at most `limit`
    async fn recent(&self, conversation_id: Uuid, limit: i64) -> StoreResult<Vec<Message>>;
}

// ============================================================================
// Conversation Store
// ============================================================================

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Bump the conversation's last-activity timestamp
    async fn touch(&self, conversation_id: Uuid) -> StoreResult<()>;
}

// ============================================================================
// Read Receipt Store
// ============================================================================

#[async_trait]
pub trait ReadReceiptStore: Send + Sync {
    /// Record that a user has read a message
    async fn create(&self, message_id: Uuid, user_id: Uuid) -> StoreResult<ReadReceipt>;
}
