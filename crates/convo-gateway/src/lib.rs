//! # convo-gateway
//!
//! WebSocket gateway for real-time conversations: connection handling,
//! per-user presence, room membership, typing indicators, and message
//! fan-out. Durable history lives behind the store traits; everything in
//! this crate is per-process, in-memory state.

pub mod connection;
pub mod events;
pub mod handlers;
pub mod messages;
pub mod presence;
pub mod protocol;
pub mod rooms;
pub mod server;
