//! End-to-end test harness
//!
//! Boots the real gateway app (router, WebSocket handshake, background
//! workers) on an ephemeral port with in-memory stores, and provides a
//! thin WebSocket client for driving it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use convo_common::{
    AppConfig, AppSettings, ChatConfig, DatabaseConfig, Environment, JwtConfig, JwtService,
    PresenceConfig, ServerConfig,
};
use convo_core::UserIdentity;
use convo_gateway::server::{create_app, spawn_workers, GatewayState, Stores};

use crate::memory::MemoryStore;

/// Typing expiry used by the harness; short enough that expiry tests
/// run in real time without dragging the suite
pub const TEST_TYPING_EXPIRY_MS: u64 = 200;

/// Default receive timeout for expected events
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn test_config() -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "convo-server-test".to_string(),
            env: Environment::Development,
        },
        gateway: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret-key".to_string(),
            access_token_expiry: 900,
        },
        chat: ChatConfig {
            max_content_length: 5000,
            history_limit: 50,
            approved_attachment_hosts: vec!["cdn.example.com".to_string()],
        },
        presence: PresenceConfig {
            typing_expiry_ms: TEST_TYPING_EXPIRY_MS,
            away_after_secs: 300,
            sweep_interval_secs: 60,
        },
    }
}

/// A running gateway instance backed by in-memory stores
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: GatewayState,
    pub store: Arc<MemoryStore>,
    pub jwt: Arc<JwtService>,
}

impl TestServer {
    /// Start the gateway on an ephemeral port
    pub async fn start() -> anyhow::Result<Self> {
        let config = test_config();
        let store = MemoryStore::shared();
        let jwt = Arc::new(JwtService::new(
            &config.jwt.secret,
            config.jwt.access_token_expiry,
        ));

        let stores = Stores {
            users: store.clone(),
            participants: store.clone(),
            messages: store.clone(),
            conversations: store.clone(),
            receipts: store.clone(),
        };

        let (state, expiry_rx) = GatewayState::new(stores, jwt.clone(), config);
        spawn_workers(state.clone(), expiry_rx);

        let app = create_app(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server error: {e}");
            }
        });

        Ok(Self {
            addr,
            state,
            store,
            jwt,
        })
    }

    /// Gateway URL with an optional raw token query parameter
    pub fn ws_url(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/gateway?token={token}", self.addr),
            None => format!("ws://{}/gateway", self.addr),
        }
    }

    /// Seed a user in the store and return their identity
    pub fn register_user(&self, first_name: &str, last_name: &str) -> UserIdentity {
        let user = UserIdentity::new(Uuid::new_v4(), first_name, last_name);
        self.store.add_user(user.clone());
        user
    }

    /// Open an authenticated WebSocket connection for a seeded user and
    /// consume the `connected` acknowledgment
    pub async fn connect_user(&self, user: &UserIdentity) -> anyhow::Result<WsClient> {
        let token = self.jwt.issue_token(user.id)?;
        let mut client = self.connect_raw(Some(&token)).await?;

        let connected = client.expect_event("connected").await?;
        anyhow::ensure!(
            connected["userId"] == json!(user.id.to_string()),
            "connected ack carried the wrong user id: {connected}"
        );

        Ok(client)
    }

    /// Open a WebSocket connection with an arbitrary (possibly absent or
    /// invalid) token; the handshake result is the caller's to assert
    pub async fn connect_raw(
        &self,
        token: Option<&str>,
    ) -> Result<WsClient, tokio_tungstenite::tungstenite::Error> {
        let (stream, _) = connect_async(self.ws_url(token)).await?;
        Ok(WsClient { stream })
    }
}

/// Thin WebSocket client around the event envelope
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send a raw event envelope
    pub async fn send_json(&mut self, value: Value) -> anyhow::Result<()> {
        self.stream
            .send(WsMessage::Text(value.to_string().into()))
            .await?;
        Ok(())
    }

    pub async fn join(&mut self, conversation_id: Uuid) -> anyhow::Result<()> {
        self.send_json(json!({
            "event": "join_conversation",
            "data": { "conversationId": conversation_id }
        }))
        .await
    }

    pub async fn leave(&mut self, conversation_id: Uuid) -> anyhow::Result<()> {
        self.send_json(json!({
            "event": "leave_conversation",
            "data": { "conversationId": conversation_id }
        }))
        .await
    }

    pub async fn send_message(
        &mut self,
        conversation_id: Uuid,
        content: &str,
    ) -> anyhow::Result<()> {
        self.send_json(json!({
            "event": "send_message",
            "data": { "conversationId": conversation_id, "content": content }
        }))
        .await
    }

    pub async fn typing_start(&mut self, conversation_id: Uuid) -> anyhow::Result<()> {
        self.send_json(json!({
            "event": "typing_start",
            "data": { "conversationId": conversation_id }
        }))
        .await
    }

    pub async fn typing_stop(&mut self, conversation_id: Uuid) -> anyhow::Result<()> {
        self.send_json(json!({
            "event": "typing_stop",
            "data": { "conversationId": conversation_id }
        }))
        .await
    }

    /// Receive the next event envelope as (event name, data)
    pub async fn next_event(&mut self) -> anyhow::Result<(String, Value)> {
        loop {
            let frame = timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .map_err(|_| anyhow::anyhow!("timed out waiting for an event"))?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))?;

            match frame? {
                WsMessage::Text(text) => {
                    let value: Value = serde_json::from_str(text.as_ref())?;
                    let event = value["event"]
                        .as_str()
                        .ok_or_else(|| anyhow::anyhow!("frame without event field: {value}"))?
                        .to_string();
                    return Ok((event, value["data"].clone()));
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) => {}
                WsMessage::Close(_) => anyhow::bail!("connection closed"),
                other => anyhow::bail!("unexpected frame: {other:?}"),
            }
        }
    }

    /// Skip unrelated events until one with the given name arrives
    pub async fn expect_event(&mut self, name: &str) -> anyhow::Result<Value> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            anyhow::ensure!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for `{name}`"
            );
            let (event, data) = self.next_event().await?;
            if event == name {
                return Ok(data);
            }
        }
    }

    /// Assert that no event with the given name arrives within `window`
    pub async fn assert_no_event(&mut self, name: &str, window: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + window;
        while tokio::time::Instant::now() < deadline {
            let remaining = deadline - tokio::time::Instant::now();
            match timeout(remaining, self.stream.next()).await {
                Err(_) => return Ok(()),
                Ok(None) => return Ok(()),
                Ok(Some(frame)) => {
                    if let WsMessage::Text(text) = frame? {
                        let value: Value = serde_json::from_str(text.as_ref())?;
                        anyhow::ensure!(
                            value["event"] != json!(name),
                            "unexpected `{name}` event: {value}"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Close the connection from the client side
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
