//! # convo-db
//!
//! PostgreSQL implementations of the store traits defined in `convo-core`.
//! The real-time gateway treats this crate as a collaborator: it persists
//! messages and read receipts, and answers participant and identity
//! lookups. Schema ownership (user CRUD, conversation CRUD) lives with
//! the HTTP API service, not here.

pub mod models;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use repositories::{
    PgConversationStore, PgMessageStore, PgParticipantStore, PgReadReceiptStore, PgUserStore,
};
