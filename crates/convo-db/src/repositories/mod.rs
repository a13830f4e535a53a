//! PostgreSQL store implementations

mod conversation;
mod error;
mod message;
mod participant;
mod receipt;
mod user;

pub use conversation::PgConversationStore;
pub use message::PgMessageStore;
pub use participant::PgParticipantStore;
pub use receipt::PgReadReceiptStore;
pub use user::PgUserStore;
