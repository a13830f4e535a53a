//! Presence registry
//!
//! The single owner of presence and typing state for this process.
//! Constructed once at startup and injected into handlers; all mutation
//! goes through its methods. Every operation is a short synchronous
//! critical section over a `DashMap` shard with no suspension point
//! inside, which is what makes the interleaving of concurrent handler
//! tasks safe.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// A user's aggregate presence status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Away,
    #[default]
    Offline,
}

impl PresenceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "offline" => Ok(Self::Offline),
            _ => Err(format!("Invalid presence status: {s}")),
        }
    }
}

/// Caller-supplied partial presence update
#[derive(Debug, Clone, Copy, Default)]
pub struct PresencePatch {
    pub status: Option<PresenceStatus>,
}

/// Notice that a typing timer elapsed without a restart.
///
/// The epoch ties the notice to the timer generation that produced it; a
/// stale notice (its timer was superseded between firing and delivery)
/// is ignored by `expire_typing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingExpired {
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub epoch: u64,
}

/// Outcome of removing a connection, so the caller can broadcast the
/// side effects
#[derive(Debug, Clone, Default)]
pub struct ConnectionRemoved {
    /// The connection set emptied and the user transitioned to offline
    pub went_offline: bool,
    /// Conversations whose typing state was cleared (timers canceled)
    pub cleared_typing: Vec<Uuid>,
}

/// A scheduled typing-expiry task. Aborting on drop is what guarantees
/// cancel-before-reschedule and cancel-on-disconnect.
struct TypingTimer {
    handle: JoinHandle<()>,
    epoch: u64,
}

impl Drop for TypingTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Per-user presence record.
///
/// Invariant: `status == Offline` iff `connections` is empty.
struct UserPresence {
    status: PresenceStatus,
    connections: HashSet<String>,
    last_seen: Instant,
    current_conversation: Option<Uuid>,
    typing: HashMap<Uuid, TypingTimer>,
}

impl UserPresence {
    fn new() -> Self {
        Self {
            status: PresenceStatus::Offline,
            connections: HashSet::new(),
            last_seen: Instant::now(),
            current_conversation: None,
            typing: HashMap::new(),
        }
    }
}

/// Presence registry for all users on this process
pub struct PresenceRegistry {
    users: DashMap<Uuid, UserPresence>,
    typing_expiry: Duration,
    typing_epoch: AtomicU64,
    expiry_tx: mpsc::UnboundedSender<TypingExpired>,
}

impl PresenceRegistry {
    /// Create a registry and the receiving end of its typing-expiry
    /// channel. The caller (the server) drives the receiver and
    /// broadcasts snapshots for expirations.
    pub fn new(typing_expiry: Duration) -> (Self, mpsc::UnboundedReceiver<TypingExpired>) {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();

        (
            Self {
                users: DashMap::new(),
                typing_expiry,
                typing_epoch: AtomicU64::new(0),
                expiry_tx,
            },
            expiry_rx,
        )
    }

    /// Register a connection for a user. Idempotent; the first connection
    /// creates the record, and any connection brings the user online.
    pub fn add_connection(&self, user_id: Uuid, connection_id: &str) {
        let mut record = self.users.entry(user_id).or_insert_with(UserPresence::new);

        record.connections.insert(connection_id.to_string());
        record.status = PresenceStatus::Online;
        record.last_seen = Instant::now();

        tracing::debug!(
            user_id = %user_id,
            connections = record.connections.len(),
            "Presence connection added"
        );
    }

    /// Remove a connection for a user. When the last connection goes, the
    /// user transitions to offline, every pending typing timer is
    /// canceled, and the current conversation is cleared.
    pub fn remove_connection(&self, user_id: Uuid, connection_id: &str) -> ConnectionRemoved {
        let Some(mut record) = self.users.get_mut(&user_id) else {
            return ConnectionRemoved::default();
        };

        record.connections.remove(connection_id);

        if !record.connections.is_empty() {
            return ConnectionRemoved::default();
        }

        // Repeated removal of an already-offline tombstone is a no-op
        if record.status == PresenceStatus::Offline {
            return ConnectionRemoved::default();
        }

        record.status = PresenceStatus::Offline;
        record.current_conversation = None;

        // Dropping the timers aborts them; no expiry fires after this
        let cleared_typing: Vec<Uuid> = record.typing.keys().copied().collect();
        record.typing.clear();

        tracing::debug!(
            user_id = %user_id,
            cleared_typing = cleared_typing.len(),
            "User went offline"
        );

        ConnectionRemoved {
            went_offline: true,
            cleared_typing,
        }
    }

    /// Merge a caller-supplied presence update. No-op for unknown users:
    /// this never creates a record, so unauthenticated callers cannot
    /// plant ghost entries.
    pub fn update_presence(&self, user_id: Uuid, patch: PresencePatch) -> bool {
        let Some(mut record) = self.users.get_mut(&user_id) else {
            return false;
        };

        if let Some(status) = patch.status {
            // Offline is derived from the connection set, never set directly
            if status != PresenceStatus::Offline && !record.connections.is_empty() {
                record.status = status;
            }
        }
        record.last_seen = Instant::now();

        true
    }

    /// Record the conversation a user last joined. Authorization happened
    /// upstream (room membership); this is bookkeeping for presence
    /// queries only.
    pub fn set_conversation(&self, user_id: Uuid, conversation_id: Option<Uuid>) {
        if let Some(mut record) = self.users.get_mut(&user_id) {
            record.current_conversation = conversation_id;
            record.last_seen = Instant::now();
        }
    }

    /// Clear the current conversation only if it matches
    pub fn clear_conversation_if_current(&self, user_id: Uuid, conversation_id: Uuid) {
        if let Some(mut record) = self.users.get_mut(&user_id) {
            if record.current_conversation == Some(conversation_id) {
                record.current_conversation = None;
            }
        }
    }

    /// Refresh a user's last-seen timestamp on any client activity
    pub fn touch(&self, user_id: Uuid) {
        if let Some(mut record) = self.users.get_mut(&user_id) {
            record.last_seen = Instant::now();
            // Activity brings an away user back online
            if record.status == PresenceStatus::Away {
                record.status = PresenceStatus::Online;
            }
        }
    }

    /// Start, restart, or stop a typing indicator for (user, conversation).
    ///
    /// Starting cancels any existing timer for the pair and schedules a
    /// fresh expiry; stopping cancels and removes. Returns `false` for
    /// unknown or offline users.
    pub fn set_typing(&self, user_id: Uuid, conversation_id: Uuid, is_typing: bool) -> bool {
        let Some(mut record) = self.users.get_mut(&user_id) else {
            return false;
        };
        if record.connections.is_empty() {
            return false;
        }

        if is_typing {
            let epoch = self.typing_epoch.fetch_add(1, Ordering::Relaxed) + 1;
            let expiry = self.typing_expiry;
            let tx = self.expiry_tx.clone();

            let handle = tokio::spawn(async move {
                tokio::time::sleep(expiry).await;
                let _ = tx.send(TypingExpired {
                    user_id,
                    conversation_id,
                    epoch,
                });
            });

            // Replacing the entry drops (and thereby aborts) the old timer
            record
                .typing
                .insert(conversation_id, TypingTimer { handle, epoch });
        } else {
            record.typing.remove(&conversation_id);
        }

        record.last_seen = Instant::now();

        true
    }

    /// Apply a typing expiry notice. Returns `true` if the pair was still
    /// typing under the same timer generation and has now been cleared;
    /// stale notices from superseded timers are discarded.
    pub fn expire_typing(&self, notice: TypingExpired) -> bool {
        let Some(mut record) = self.users.get_mut(&notice.user_id) else {
            return false;
        };

        match record.typing.get(&notice.conversation_id) {
            Some(timer) if timer.epoch == notice.epoch => {
                record.typing.remove(&notice.conversation_id);
                true
            }
            _ => false,
        }
    }

    /// Check if a user has at least one live connection
    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.users
            .get(&user_id)
            .is_some_and(|r| !r.connections.is_empty())
    }

    /// Get a user's current status (offline when unknown)
    pub fn status(&self, user_id: Uuid) -> PresenceStatus {
        self.users
            .get(&user_id)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    /// All users currently online or away
    pub fn online_users(&self) -> Vec<Uuid> {
        let mut users: Vec<Uuid> = self
            .users
            .iter()
            .filter(|r| !r.connections.is_empty())
            .map(|r| *r.key())
            .collect();
        users.sort();
        users
    }

    /// Users whose last-joined conversation is the given one
    pub fn users_in_conversation(&self, conversation_id: Uuid) -> Vec<Uuid> {
        let mut users: Vec<Uuid> = self
            .users
            .iter()
            .filter(|r| r.current_conversation == Some(conversation_id))
            .map(|r| *r.key())
            .collect();
        users.sort();
        users
    }

    /// Users currently typing in a conversation
    pub fn typing_users(&self, conversation_id: Uuid) -> Vec<Uuid> {
        let mut users: Vec<Uuid> = self
            .users
            .iter()
            .filter(|r| r.typing.contains_key(&conversation_id))
            .map(|r| *r.key())
            .collect();
        users.sort();
        users
    }

    /// Demote online users whose last activity is older than `threshold`
    /// to away. Offline users (empty connection sets) are never touched.
    /// Returns the demoted user ids.
    pub fn sweep_inactive(&self, threshold: Duration) -> Vec<Uuid> {
        let now = Instant::now();
        let mut demoted = Vec::new();

        for mut record in self.users.iter_mut() {
            if record.connections.is_empty() || record.status != PresenceStatus::Online {
                continue;
            }

            if now.duration_since(record.last_seen) > threshold {
                record.status = PresenceStatus::Away;
                demoted.push(*record.key());
            }
        }

        if !demoted.is_empty() {
            tracing::debug!(count = demoted.len(), "Inactive users demoted to away");
        }

        demoted
    }
}

impl std::fmt::Debug for PresenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceRegistry")
            .field("users", &self.users.len())
            .field("typing_expiry", &self.typing_expiry)
            .finish()
    }
}
