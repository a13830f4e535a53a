//! Wire protocol
//!
//! Defines the envelope and payload types exchanged over the WebSocket.

mod messages;
mod payloads;

pub use messages::{ClientMessage, ServerMessage};
pub use payloads::{
    JoinConversationPayload, LeaveConversationPayload, SendMessagePayload, SetPresencePayload,
    TypingPayload,
};
