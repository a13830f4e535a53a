//! Typing indicator and disconnect-cleanup integration tests
//!
//! The harness runs with a 200 ms typing expiry so real-time waits stay
//! short. Timer-precision properties (restart coalescing, epoch
//! checks) are additionally covered by the presence registry unit tests
//! under a paused clock.
//!
//! Run with: cargo test -p integration-tests --test typing_tests

use std::collections::HashSet;
use std::time::Duration;

use integration_tests::harness::TEST_TYPING_EXPIRY_MS;
use integration_tests::TestServer;
use serde_json::json;
use uuid::Uuid;

/// Comfortable margin past the typing expiry window
const EXPIRY_WAIT: Duration = Duration::from_millis(TEST_TYPING_EXPIRY_MS + 150);

fn typing_user_ids(data: &serde_json::Value) -> Vec<String> {
    data["typingUsers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["userId"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_typing_snapshot_is_broadcast_to_room() {
    let server = TestServer::start().await.unwrap();
    let typist = server.register_user("Ty", "Pist");
    let watcher = server.register_user("Wat", "Cher");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, typist.id);
    server.store.add_participant(convo, watcher.id);

    let mut typist_ws = server.connect_user(&typist).await.unwrap();
    let mut watcher_ws = server.connect_user(&watcher).await.unwrap();
    typist_ws.join(convo).await.unwrap();
    watcher_ws.join(convo).await.unwrap();
    typist_ws.expect_event("conversation_joined").await.unwrap();
    watcher_ws.expect_event("conversation_joined").await.unwrap();

    typist_ws.typing_start(convo).await.unwrap();

    // The snapshot reaches the whole room, typist included
    let snapshot = watcher_ws.expect_event("typing_users_updated").await.unwrap();
    assert_eq!(snapshot["conversationId"], json!(convo.to_string()));
    assert_eq!(typing_user_ids(&snapshot), vec![typist.id.to_string()]);
    assert_eq!(
        snapshot["typingUsers"][0]["firstName"],
        json!("Ty"),
        "typing entries carry display names"
    );

    let own = typist_ws.expect_event("typing_users_updated").await.unwrap();
    assert_eq!(typing_user_ids(&own), vec![typist.id.to_string()]);

    // Explicit stop broadcasts the emptied snapshot
    typist_ws.typing_stop(convo).await.unwrap();
    let snapshot = watcher_ws.expect_event("typing_users_updated").await.unwrap();
    assert!(typing_user_ids(&snapshot).is_empty());
}

#[tokio::test]
async fn test_typing_expires_after_quiet_period() {
    let server = TestServer::start().await.unwrap();
    let typist = server.register_user("Quiet", "Typist");
    let watcher = server.register_user("Quiet", "Watcher");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, typist.id);
    server.store.add_participant(convo, watcher.id);

    let mut typist_ws = server.connect_user(&typist).await.unwrap();
    let mut watcher_ws = server.connect_user(&watcher).await.unwrap();
    typist_ws.join(convo).await.unwrap();
    watcher_ws.join(convo).await.unwrap();
    typist_ws.expect_event("conversation_joined").await.unwrap();
    watcher_ws.expect_event("conversation_joined").await.unwrap();

    typist_ws.typing_start(convo).await.unwrap();
    let snapshot = watcher_ws.expect_event("typing_users_updated").await.unwrap();
    assert_eq!(typing_user_ids(&snapshot), vec![typist.id.to_string()]);

    // No further events: the quiet period elapses and the expiry
    // broadcasts exactly one removal snapshot
    tokio::time::sleep(EXPIRY_WAIT).await;
    let snapshot = watcher_ws.expect_event("typing_users_updated").await.unwrap();
    assert!(typing_user_ids(&snapshot).is_empty());

    watcher_ws
        .assert_no_event("typing_users_updated", Duration::from_millis(400))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_typing_restart_produces_single_expiry() {
    let server = TestServer::start().await.unwrap();
    let typist = server.register_user("Re", "Start");
    let watcher = server.register_user("Re", "Watcher");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, typist.id);
    server.store.add_participant(convo, watcher.id);

    let mut typist_ws = server.connect_user(&typist).await.unwrap();
    let mut watcher_ws = server.connect_user(&watcher).await.unwrap();
    typist_ws.join(convo).await.unwrap();
    watcher_ws.join(convo).await.unwrap();
    typist_ws.expect_event("conversation_joined").await.unwrap();
    watcher_ws.expect_event("conversation_joined").await.unwrap();

    // Restart inside the quiet period supersedes the first timer
    typist_ws.typing_start(convo).await.unwrap();
    tokio::time::sleep(Duration::from_millis(TEST_TYPING_EXPIRY_MS / 2)).await;
    typist_ws.typing_start(convo).await.unwrap();

    // Start and restart each broadcast a full snapshot with the typist
    for _ in 0..2 {
        let snapshot = watcher_ws.expect_event("typing_users_updated").await.unwrap();
        assert_eq!(typing_user_ids(&snapshot), vec![typist.id.to_string()]);
    }

    // A single expiry snapshot after the final timer's full window
    tokio::time::sleep(EXPIRY_WAIT).await;
    let snapshot = watcher_ws.expect_event("typing_users_updated").await.unwrap();
    assert!(typing_user_ids(&snapshot).is_empty());

    watcher_ws
        .assert_no_event("typing_users_updated", Duration::from_millis(400))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_typing_requires_room_membership() {
    let server = TestServer::start().await.unwrap();
    let user = server.register_user("No", "Room");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, user.id);

    let mut ws = server.connect_user(&user).await.unwrap();

    // Typing without having joined the room is rejected
    ws.typing_start(convo).await.unwrap();
    let error = ws.expect_event("error").await.unwrap();
    assert_eq!(error["message"], json!("Not a participant in this conversation"));
}

#[tokio::test]
async fn test_disconnect_cancels_typing_and_goes_offline() {
    let server = TestServer::start().await.unwrap();
    let typist = server.register_user("Gone", "Typist");
    let watcher = server.register_user("Gone", "Watcher");
    let convo_a = Uuid::new_v4();
    let convo_b = Uuid::new_v4();
    for convo in [convo_a, convo_b] {
        server.store.add_conversation(convo);
        server.store.add_participant(convo, typist.id);
        server.store.add_participant(convo, watcher.id);
    }

    let mut typist_ws = server.connect_user(&typist).await.unwrap();
    let mut watcher_ws = server.connect_user(&watcher).await.unwrap();
    for convo in [convo_a, convo_b] {
        typist_ws.join(convo).await.unwrap();
        watcher_ws.join(convo).await.unwrap();
        typist_ws.expect_event("conversation_joined").await.unwrap();
        watcher_ws.expect_event("conversation_joined").await.unwrap();
    }

    // Two active typing timers for the same user
    typist_ws.typing_start(convo_a).await.unwrap();
    typist_ws.typing_start(convo_b).await.unwrap();
    for _ in 0..2 {
        let snapshot = watcher_ws.expect_event("typing_users_updated").await.unwrap();
        assert_eq!(typing_user_ids(&snapshot), vec![typist.id.to_string()]);
    }

    // Last connection closes: both timers are canceled and the cleared
    // snapshots are broadcast before the offline transition
    typist_ws.close().await.unwrap();

    let mut cleared = HashSet::new();
    for _ in 0..2 {
        let snapshot = watcher_ws.expect_event("typing_users_updated").await.unwrap();
        assert!(typing_user_ids(&snapshot).is_empty());
        cleared.insert(snapshot["conversationId"].as_str().unwrap().to_string());
    }
    assert_eq!(
        cleared,
        HashSet::from([convo_a.to_string(), convo_b.to_string()])
    );

    let presence = watcher_ws.expect_event("presence_updated").await.unwrap();
    assert_eq!(presence["userId"], json!(typist.id.to_string()));
    assert_eq!(presence["status"], json!("offline"));

    // No spurious expiry-driven snapshots later
    watcher_ws
        .assert_no_event("typing_users_updated", EXPIRY_WAIT + Duration::from_millis(200))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_second_connection_keeps_user_online() {
    let server = TestServer::start().await.unwrap();
    let user = server.register_user("Multi", "Device");
    let watcher = server.register_user("Multi", "Watcher");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, user.id);
    server.store.add_participant(convo, watcher.id);

    let first = server.connect_user(&user).await.unwrap();
    let _second = server.connect_user(&user).await.unwrap();
    let mut watcher_ws = server.connect_user(&watcher).await.unwrap();
    watcher_ws.join(convo).await.unwrap();
    watcher_ws.expect_event("conversation_joined").await.unwrap();

    // Dropping one of two connections must not announce offline
    first.close().await.unwrap();
    watcher_ws
        .assert_no_event("presence_updated", Duration::from_millis(400))
        .await
        .unwrap();

    assert!(server.state.presence().is_online(user.id));
}
