//! Server events
//!
//! Event type names and payload structures for everything the gateway
//! pushes to clients.

mod event_types;
mod payloads;

pub use event_types::ServerEventType;
pub use payloads::{
    ConnectedEvent, ConversationJoinedEvent, ConversationLeftEvent, ErrorEvent,
    PresenceUpdatedEvent, TypingUser, TypingUsersEvent, UserLeftEvent, WireMessage, WireReplyTo,
    WireUser,
};
