//! Handler error types

use convo_core::DomainError;
use thiserror::Error;

/// Handler error type
///
/// Every variant maps to exactly one user-facing `error` event message.
/// Infrastructure failures are logged with detail but surfaced
/// generically.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The user is not a member of the conversation
    #[error("Not a participant in this conversation")]
    NotParticipant,

    /// The participant record carries the mute flag
    #[error("You are muted in this conversation")]
    Muted,

    /// Per-user message cooldown exceeded
    #[error("You are sending messages too quickly")]
    RateLimited,

    /// Reply target missing or in a different conversation
    #[error("Reply message not found in this conversation")]
    ReplyNotFound,

    /// Attachment URL could not be parsed
    #[error("Attachment URL is malformed")]
    AttachmentMalformed,

    /// Attachment URL uses an insecure scheme
    #[error("Only HTTPS attachment URLs are allowed")]
    AttachmentNotHttps,

    /// Attachment URL points at an unapproved host
    #[error("Attachment URL must be from an approved storage host")]
    AttachmentUntrustedHost,

    /// Any other payload-level rejection
    #[error("{0}")]
    Validation(String),

    /// Store/collaborator failure
    #[error("Store error: {0}")]
    Store(#[from] DomainError),
}

impl HandlerError {
    /// The message carried by the `error` event sent to the client
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(e) if e.is_infrastructure() => "Internal server error".to_string(),
            Self::Store(e) => e.to_string(),
            other => other.to_string(),
        }
    }

    /// Check if this error should be logged as a server-side failure
    /// rather than a client mistake
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_infrastructure())
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
