//! Per-user presence tracking
//!
//! Aggregate online/away/offline status across all of a user's
//! connections, the conversation each user last joined, and typing
//! indicators with auto-expiry timers.

mod registry;

pub use registry::{
    ConnectionRemoved, PresencePatch, PresenceRegistry, PresenceStatus, TypingExpired,
};
