//! Store traits (ports) - the narrow persistence interfaces the
//! real-time core consumes

mod stores;

pub use stores::{
    ConversationStore, MessageStore, ParticipantStore, ReadReceiptStore, StoreResult, UserStore,
};
