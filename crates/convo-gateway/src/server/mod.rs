//! Gateway server setup
//!
//! Wires the WebSocket route, builds the application state from
//! configuration, and starts the background workers (typing expiry,
//! presence sweep).

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::{GatewayState, Stores};

use axum::{routing::get, Router};
use convo_common::{AppConfig, AppError, JwtService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::interval;
use tower_http::trace::TraceLayer;

use crate::handlers::{broadcast_presence_update, broadcast_typing_snapshot};
use crate::presence::TypingExpired;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create the `GatewayState`
pub async fn create_gateway_state(
    config: AppConfig,
) -> Result<(GatewayState, mpsc::UnboundedReceiver<TypingExpired>), AppError> {
    tracing::info!("Connecting to PostgreSQL...");
    let db_config = convo_db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..Default::default()
    };
    let pool = convo_db::create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
    ));

    let stores = Stores {
        users: Arc::new(convo_db::PgUserStore::new(pool.clone())),
        participants: Arc::new(convo_db::PgParticipantStore::new(pool.clone())),
        messages: Arc::new(convo_db::PgMessageStore::new(pool.clone())),
        conversations: Arc::new(convo_db::PgConversationStore::new(pool.clone())),
        receipts: Arc::new(convo_db::PgReadReceiptStore::new(pool)),
    };

    Ok(GatewayState::new(stores, jwt_service, config))
}

/// Start the background workers.
///
/// The typing-expiry worker consumes timer firings and clears/broadcasts
/// only when the firing still matches the live timer generation. The
/// sweep worker demotes inactive users to away on a fixed period.
pub fn spawn_workers(state: GatewayState, mut expiry_rx: mpsc::UnboundedReceiver<TypingExpired>) {
    let typing_state = state.clone();
    tokio::spawn(async move {
        while let Some(notice) = expiry_rx.recv().await {
            if typing_state.presence().expire_typing(notice) {
                tracing::trace!(
                    user_id = %notice.user_id,
                    conversation_id = %notice.conversation_id,
                    "Typing indicator expired"
                );
                broadcast_typing_snapshot(&typing_state, notice.conversation_id).await;
            }
        }
    });

    tokio::spawn(async move {
        let period = Duration::from_secs(state.config().presence.sweep_interval_secs);
        let threshold = Duration::from_secs(state.config().presence.away_after_secs);
        let mut ticker = interval(period);

        loop {
            ticker.tick().await;

            for user_id in state.presence().sweep_inactive(threshold) {
                broadcast_presence_update(&state, user_id).await;
            }
        }
    });
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.gateway.port));

    let (state, expiry_rx) = create_gateway_state(config).await?;

    spawn_workers(state.clone(), expiry_rx);

    let app = create_app(state);

    run_server(app, addr).await
}
