//! # convo-core
//!
//! Domain layer for the conversation server: entities, store traits
//! (the narrow interfaces the real-time core consumes persistence
//! through), and content sanitizing.

pub mod entities;
pub mod error;
pub mod sanitize;
pub mod traits;

pub use entities::{
    Conversation, Message, MessageType, NewMessage, Participant, ParticipantRole, ReadReceipt,
    UserIdentity,
};
pub use error::DomainError;
pub use sanitize::sanitize_content;
pub use traits::{
    ConversationStore, MessageStore, ParticipantStore, ReadReceiptStore, StoreResult, UserStore,
};
