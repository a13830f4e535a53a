//! WebSocket handler
//!
//! Authenticates handshakes, pumps frames for established connections,
//! and runs the disconnect finalizer.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use convo_common::{AppError, AppResult};
use convo_core::UserIdentity;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::events::{ConnectedEvent, PresenceUpdatedEvent, ServerEventType};
use crate::handlers::{broadcast_typing_snapshot, EventDispatcher};
use crate::presence::PresenceStatus;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::server::GatewayState;

/// Channel buffer size for outgoing messages
const MESSAGE_BUFFER_SIZE: usize = 64;

/// Handshake query parameters
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    token: Option<String>,
}

/// WebSocket gateway handler.
///
/// The bearer credential is checked before the upgrade: a missing,
/// malformed, expired, or unresolvable token refuses the connection with
/// 401 and no gateway state is created.
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let user = match authenticate(&state, params.token.as_deref()).await {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(error = %e, "Connection refused at handshake");
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(state, socket, user))
        .into_response()
}

/// Resolve the handshake credential to a user identity
async fn authenticate(state: &GatewayState, token: Option<&str>) -> AppResult<UserIdentity> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingToken)?;
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let claims = state.jwt_service().validate_token(token)?;
    let user_id = claims.user_id()?;

    state
        .stores()
        .users
        .find_identity(user_id)
        .await?
        .ok_or(AppError::InvalidToken)
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, user: UserIdentity) {
    let connection_id = Connection::generate_id();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(MESSAGE_BUFFER_SIZE);
    let connection = Connection::new(connection_id.clone(), user, tx);

    state.connection_manager().add_connection(connection.clone());
    state
        .presence()
        .add_connection(connection.user_id(), &connection_id);

    tracing::info!(
        connection_id = %connection_id,
        user_id = %connection.user_id(),
        "WebSocket connection established"
    );

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Acknowledge the authenticated connection immediately
    let ack = ServerMessage::new(
        ServerEventType::Connected,
        ConnectedEvent {
            user_id: connection.user_id(),
            timestamp: Utc::now(),
        },
    );
    if let Ok(json) = ack.to_json() {
        if ws_sink.send(Message::Text(json.into())).await.is_err() {
            tracing::warn!(connection_id = %connection_id, "Failed to send connected ack");
            cleanup_connection(&state, &connection).await;
            return;
        }
    }

    // Task to receive frames from the WebSocket
    let state_recv = state.clone();
    let connection_recv = connection.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text_frame(&state_recv, &connection_recv, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        connection_id = %connection_recv.connection_id(),
                        "Binary frame ignored"
                    );
                    let _ = connection_recv
                        .send(ServerMessage::error("Binary frames are not supported"))
                        .await;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong replies are handled by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(
                        connection_id = %connection_recv.connection_id(),
                        "Client closed connection"
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_recv.connection_id(),
                        error = %e,
                        "WebSocket error"
                    );
                    break;
                }
            }
        }
    });

    // Task to forward outbound messages to the WebSocket
    let connection_id_send = connection_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = msg.to_json() {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    tracing::debug!(
                        connection_id = %connection_id_send,
                        "Failed to forward message to WebSocket"
                    );
                    break;
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    // Either side ending (client close, network failure, send failure)
    // tears the connection down
    tokio::select! {
        _ = recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task ended");
        }
        _ = send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task ended");
        }
    }

    // Guaranteed finalizer: runs regardless of how the session ended
    cleanup_connection(&state, &connection).await;
}

/// Parse and dispatch one text frame. Handler failures become a single
/// `error` event; the connection stays alive.
async fn handle_text_frame(state: &GatewayState, connection: &Arc<Connection>, text: &str) {
    match ClientMessage::from_json(text) {
        Ok(event) => {
            if let Err(e) = EventDispatcher::dispatch(state, connection, event).await {
                if e.is_infrastructure() {
                    tracing::warn!(
                        connection_id = %connection.connection_id(),
                        error = %e,
                        "Handler failed"
                    );
                } else {
                    tracing::debug!(
                        connection_id = %connection.connection_id(),
                        error = %e,
                        "Client event rejected"
                    );
                }

                let _ = connection.send(ServerMessage::error(e.user_message())).await;
            }
        }
        Err(e) => {
            tracing::debug!(
                connection_id = %connection.connection_id(),
                error = %e,
                "Failed to parse client frame"
            );
            let _ = connection
                .send(ServerMessage::error("Invalid message format"))
                .await;
        }
    }
}

/// Clean up a connection on disconnect.
///
/// This is the only path back toward offline, so it runs
/// unconditionally: membership maps are scrubbed, typing timers are
/// canceled (with snapshots broadcast for the cleared conversations),
/// and the offline transition is announced to the rooms the connection
/// had joined.
pub(crate) async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    let connection_id = connection.connection_id();
    let user_id = connection.user_id();

    tracing::info!(connection_id = %connection_id, "Cleaning up connection");

    // Captured before removal scrubs the membership maps
    let rooms = connection.rooms();

    state.connection_manager().remove_connection(connection_id);
    let removed = state.presence().remove_connection(user_id, connection_id);

    for conversation_id in removed.cleared_typing {
        broadcast_typing_snapshot(state, conversation_id).await;
    }

    if removed.went_offline {
        let event = PresenceUpdatedEvent {
            user_id,
            status: PresenceStatus::Offline.to_string(),
            timestamp: Utc::now(),
        };
        let message = ServerMessage::new(ServerEventType::PresenceUpdated, &event);

        for conversation_id in rooms {
            state
                .connection_manager()
                .send_to_room(conversation_id, message.clone(), None)
                .await;
        }

        tracing::debug!(user_id = %user_id, "User presence set to offline");
    }
}
