//! Gateway state
//!
//! Application state for the gateway server: the store collaborators,
//! connection manager, presence registry, and shared services. Built
//! once at startup and cloned into every handler.

use convo_common::{AppConfig, JwtService};
use convo_core::{
    ConversationStore, MessageStore, ParticipantStore, ReadReceiptStore, UserStore,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::connection::ConnectionManager;
use crate::presence::{PresenceRegistry, TypingExpired};

/// Messages allowed per user per second (cooldown policy)
const MESSAGE_RATE_PER_SECOND: u32 = 5;

/// Short burst tolerated above the sustained rate
const MESSAGE_RATE_BURST: u32 = 10;

/// The persistence collaborators the gateway consumes
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub participants: Arc<dyn ParticipantStore>,
    pub messages: Arc<dyn MessageStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub receipts: Arc<dyn ReadReceiptStore>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Persistence collaborators
    stores: Arc<Stores>,
    /// Connection manager for WebSocket connections and broadcast groups
    connection_manager: Arc<ConnectionManager>,
    /// Presence and typing registry
    presence: Arc<PresenceRegistry>,
    /// JWT validation for the handshake
    jwt_service: Arc<JwtService>,
    /// Per-user send cooldown
    message_cooldown: Arc<DefaultKeyedRateLimiter<Uuid>>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create the gateway state and the typing-expiry stream its worker
    /// consumes
    pub fn new(
        stores: Stores,
        jwt_service: Arc<JwtService>,
        config: AppConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TypingExpired>) {
        let typing_expiry = Duration::from_millis(config.presence.typing_expiry_ms);
        let (presence, expiry_rx) = PresenceRegistry::new(typing_expiry);

        let state = Self {
            stores: Arc::new(stores),
            connection_manager: ConnectionManager::new_shared(),
            presence: Arc::new(presence),
            jwt_service,
            message_cooldown: Arc::new(RateLimiter::keyed(cooldown_quota())),
            config: Arc::new(config),
        };

        (state, expiry_rx)
    }

    /// Get the store collaborators
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Get the connection manager
    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    /// Get the presence registry
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Get the JWT service
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Get the per-user message cooldown limiter
    pub fn message_cooldown(&self) -> &DefaultKeyedRateLimiter<Uuid> {
        &self.message_cooldown
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .field("presence", &self.presence)
            .finish_non_exhaustive()
    }
}

/// One coherent cooldown policy for the whole pipeline: a sustained
/// per-second rate with a small burst allowance.
fn cooldown_quota() -> Quota {
    let rate = NonZeroU32::new(MESSAGE_RATE_PER_SECOND).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(MESSAGE_RATE_BURST).unwrap_or(NonZeroU32::MIN);
    Quota::per_second(rate).allow_burst(burst)
}
