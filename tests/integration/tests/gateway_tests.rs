//! Gateway integration tests
//!
//! Drive the real server (handshake, dispatcher, fan-out) over real
//! WebSockets against in-memory stores.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::TestServer;
use serde_json::json;
use tokio_tungstenite::tungstenite;
use uuid::Uuid;

// ============================================================================
// Handshake
// ============================================================================

fn assert_unauthorized(result: Result<integration_tests::WsClient, tungstenite::Error>) {
    match result {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 401, "expected a 401 refusal");
        }
        Err(other) => panic!("expected an HTTP refusal, got: {other:?}"),
        Ok(_) => panic!("handshake should have been refused"),
    }
}

#[tokio::test]
async fn test_handshake_refused_without_token() {
    let server = TestServer::start().await.unwrap();
    assert_unauthorized(server.connect_raw(None).await);
}

#[tokio::test]
async fn test_handshake_refused_with_garbage_token() {
    let server = TestServer::start().await.unwrap();
    assert_unauthorized(server.connect_raw(Some("not.a.jwt")).await);
}

#[tokio::test]
async fn test_handshake_refused_for_unknown_user() {
    let server = TestServer::start().await.unwrap();

    // Valid signature, but the subject resolves to no user
    let token = server.jwt.issue_token(Uuid::new_v4()).unwrap();
    assert_unauthorized(server.connect_raw(Some(&token)).await);
}

#[tokio::test]
async fn test_connected_ack_carries_user_id() {
    let server = TestServer::start().await.unwrap();
    let user = server.register_user("Ada", "Lovelace");

    let token = server.jwt.issue_token(user.id).unwrap();
    let mut client = server.connect_raw(Some(&token)).await.unwrap();

    let (event, data) = client.next_event().await.unwrap();
    assert_eq!(event, "connected");
    assert_eq!(data["userId"], json!(user.id.to_string()));
    assert!(data["timestamp"].is_string());
}

// ============================================================================
// Room membership
// ============================================================================

#[tokio::test]
async fn test_join_requires_participant() {
    let server = TestServer::start().await.unwrap();
    let outsider = server.register_user("Out", "Sider");
    let member = server.register_user("In", "Sider");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, member.id);

    let mut outsider_ws = server.connect_user(&outsider).await.unwrap();
    outsider_ws.join(convo).await.unwrap();

    // Exactly one error, no conversation_joined
    let (event, data) = outsider_ws.next_event().await.unwrap();
    assert_eq!(event, "error");
    assert_eq!(data["message"], json!("Not a participant in this conversation"));
    outsider_ws
        .assert_no_event("conversation_joined", Duration::from_millis(300))
        .await
        .unwrap();

    // No subscription happened: a message to the room never reaches the
    // rejected connection
    let mut member_ws = server.connect_user(&member).await.unwrap();
    member_ws.join(convo).await.unwrap();
    member_ws.expect_event("conversation_joined").await.unwrap();
    member_ws.send_message(convo, "secret").await.unwrap();
    member_ws.expect_event("message_sent").await.unwrap();

    outsider_ws
        .assert_no_event("message_received", Duration::from_millis(300))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_history_replay_oldest_first() {
    let server = TestServer::start().await.unwrap();
    let author = server.register_user("Hist", "Author");
    let reader = server.register_user("Hist", "Reader");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, author.id);
    server.store.add_participant(convo, reader.id);

    server.store.seed_message(convo, author.id, "first");
    server.store.seed_message(convo, author.id, "second");
    server.store.seed_message(convo, author.id, "third");

    let mut reader_ws = server.connect_user(&reader).await.unwrap();
    reader_ws.join(convo).await.unwrap();

    let joined = reader_ws.expect_event("conversation_joined").await.unwrap();
    assert_eq!(joined["conversationId"], json!(convo.to_string()));

    let messages = joined["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["content"], json!("first"));
    assert_eq!(messages[2]["content"], json!("third"));
    // sender display fields are resolved
    assert_eq!(messages[0]["sender"]["firstName"], json!("Hist"));
}

#[tokio::test]
async fn test_leave_notifies_remaining_subscribers() {
    let server = TestServer::start().await.unwrap();
    let leaver = server.register_user("Lee", "Ver");
    let stayer = server.register_user("Stay", "Er");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, leaver.id);
    server.store.add_participant(convo, stayer.id);

    let mut leaver_ws = server.connect_user(&leaver).await.unwrap();
    let mut stayer_ws = server.connect_user(&stayer).await.unwrap();
    leaver_ws.join(convo).await.unwrap();
    stayer_ws.join(convo).await.unwrap();
    leaver_ws.expect_event("conversation_joined").await.unwrap();
    stayer_ws.expect_event("conversation_joined").await.unwrap();

    leaver_ws.leave(convo).await.unwrap();

    // Leaver gets the ack, not the user_left broadcast
    let ack = leaver_ws.expect_event("conversation_left").await.unwrap();
    assert_eq!(ack["conversationId"], json!(convo.to_string()));

    // Remaining subscribers hear who left
    let left = stayer_ws.expect_event("user_left").await.unwrap();
    assert_eq!(left["userId"], json!(leaver.id.to_string()));
    assert_eq!(left["firstName"], json!("Lee"));

    // Leaving is idempotent: a second leave still acks
    leaver_ws.leave(convo).await.unwrap();
    leaver_ws.expect_event("conversation_left").await.unwrap();
}

// ============================================================================
// Message pipeline
// ============================================================================

#[tokio::test]
async fn test_message_fanout_and_activity_bump() {
    let server = TestServer::start().await.unwrap();
    let alice = server.register_user("Alice", "Sender");
    let bob = server.register_user("Bob", "Receiver");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, alice.id);
    server.store.add_participant(convo, bob.id);

    let mut alice_ws = server.connect_user(&alice).await.unwrap();
    let mut bob_ws = server.connect_user(&bob).await.unwrap();
    alice_ws.join(convo).await.unwrap();
    bob_ws.join(convo).await.unwrap();
    alice_ws.expect_event("conversation_joined").await.unwrap();
    bob_ws.expect_event("conversation_joined").await.unwrap();

    assert!(server.store.last_message_at(convo).is_none());

    alice_ws.send_message(convo, "hi").await.unwrap();

    // Sender gets the echo, and only the echo
    let sent = alice_ws.expect_event("message_sent").await.unwrap();
    assert_eq!(sent["content"], json!("hi"));
    assert_eq!(sent["sender"]["id"], json!(alice.id.to_string()));
    alice_ws
        .assert_no_event("message_received", Duration::from_millis(300))
        .await
        .unwrap();

    // The room gets the broadcast with the sender resolved
    let received = bob_ws.expect_event("message_received").await.unwrap();
    assert_eq!(received["content"], json!("hi"));
    assert_eq!(received["sender"]["id"], json!(alice.id.to_string()));
    assert_eq!(received["conversationId"], json!(convo.to_string()));
    assert!(received["timestamp"].is_string());

    // Activity bump and sender read receipt were recorded
    assert!(server.store.last_message_at(convo).is_some());
    let message_id: Uuid = sent["id"].as_str().unwrap().parse().unwrap();
    let receipts = server.store.receipts_for(message_id);
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].user_id, alice.id);
}

#[tokio::test]
async fn test_muted_participant_cannot_send() {
    let server = TestServer::start().await.unwrap();
    let muted = server.register_user("Mu", "Ted");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_muted_participant(convo, muted.id);

    let mut ws = server.connect_user(&muted).await.unwrap();
    ws.join(convo).await.unwrap();
    ws.expect_event("conversation_joined").await.unwrap();

    ws.send_message(convo, "let me speak").await.unwrap();

    let error = ws.expect_event("error").await.unwrap();
    assert_eq!(error["message"], json!("You are muted in this conversation"));

    // The persistence create call never ran
    assert_eq!(server.store.message_create_calls(), 0);
    assert!(server.store.last_message_at(convo).is_none());
}

#[tokio::test]
async fn test_attachment_rejections_are_specific() {
    let server = TestServer::start().await.unwrap();
    let user = server.register_user("At", "Tach");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, user.id);

    let mut ws = server.connect_user(&user).await.unwrap();
    ws.join(convo).await.unwrap();
    ws.expect_event("conversation_joined").await.unwrap();

    // Non-HTTPS scheme
    ws.send_json(json!({
        "event": "send_message",
        "data": {
            "conversationId": convo,
            "content": "pic",
            "attachmentUrl": "http://cdn.example.com/x.png",
            "attachmentType": "image/png"
        }
    }))
    .await
    .unwrap();
    let error = ws.expect_event("error").await.unwrap();
    assert_eq!(error["message"], json!("Only HTTPS attachment URLs are allowed"));

    // Unapproved host
    ws.send_json(json!({
        "event": "send_message",
        "data": {
            "conversationId": convo,
            "content": "pic",
            "attachmentUrl": "https://evil.example.net/x.png"
        }
    }))
    .await
    .unwrap();
    let error = ws.expect_event("error").await.unwrap();
    assert_eq!(
        error["message"],
        json!("Attachment URL must be from an approved storage host")
    );

    // Malformed URL
    ws.send_json(json!({
        "event": "send_message",
        "data": {
            "conversationId": convo,
            "content": "pic",
            "attachmentUrl": "::not a url::"
        }
    }))
    .await
    .unwrap();
    let error = ws.expect_event("error").await.unwrap();
    assert_eq!(error["message"], json!("Attachment URL is malformed"));

    // None of the rejected sends persisted anything
    assert_eq!(server.store.message_create_calls(), 0);

    // A valid attachment goes through
    ws.send_json(json!({
        "event": "send_message",
        "data": {
            "conversationId": convo,
            "content": "pic",
            "attachmentUrl": "https://cdn.example.com/x.png",
            "attachmentType": "image/png"
        }
    }))
    .await
    .unwrap();
    let sent = ws.expect_event("message_sent").await.unwrap();
    assert_eq!(sent["attachmentUrl"], json!("https://cdn.example.com/x.png"));
}

#[tokio::test]
async fn test_reply_target_must_exist_in_conversation() {
    let server = TestServer::start().await.unwrap();
    let user = server.register_user("Re", "Ply");
    let convo = Uuid::new_v4();
    let other_convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_conversation(other_convo);
    server.store.add_participant(convo, user.id);

    // A message that lives in a different conversation
    let elsewhere = server.store.seed_message(other_convo, user.id, "elsewhere");

    let mut ws = server.connect_user(&user).await.unwrap();
    ws.join(convo).await.unwrap();
    ws.expect_event("conversation_joined").await.unwrap();

    for reply_to in [Uuid::new_v4(), elsewhere.id] {
        ws.send_json(json!({
            "event": "send_message",
            "data": {
                "conversationId": convo,
                "content": "re",
                "replyToId": reply_to
            }
        }))
        .await
        .unwrap();

        let error = ws.expect_event("error").await.unwrap();
        assert_eq!(
            error["message"],
            json!("Reply message not found in this conversation")
        );
    }

    assert_eq!(server.store.message_create_calls(), 0);

    // Replying to a real message resolves the target on the wire
    let target = server.store.seed_message(convo, user.id, "original");
    ws.send_json(json!({
        "event": "send_message",
        "data": {
            "conversationId": convo,
            "content": "re",
            "replyToId": target.id
        }
    }))
    .await
    .unwrap();

    let sent = ws.expect_event("message_sent").await.unwrap();
    assert_eq!(sent["replyTo"]["id"], json!(target.id.to_string()));
    assert_eq!(sent["replyTo"]["content"], json!("original"));
}

#[tokio::test]
async fn test_content_is_sanitized_on_the_wire() {
    let server = TestServer::start().await.unwrap();
    let user = server.register_user("Sani", "Tizer");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, user.id);

    let mut ws = server.connect_user(&user).await.unwrap();
    ws.join(convo).await.unwrap();
    ws.expect_event("conversation_joined").await.unwrap();

    ws.send_message(convo, "<script>alert('x')</script><b>hello</b>")
        .await
        .unwrap();

    let sent = ws.expect_event("message_sent").await.unwrap();
    assert_eq!(sent["content"], json!("hello"));
}

#[tokio::test]
async fn test_empty_content_rejected() {
    let server = TestServer::start().await.unwrap();
    let user = server.register_user("Emp", "Ty");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, user.id);

    let mut ws = server.connect_user(&user).await.unwrap();
    ws.join(convo).await.unwrap();
    ws.expect_event("conversation_joined").await.unwrap();

    // HTML that strips down to nothing counts as empty
    ws.send_message(convo, "<b></b>  ").await.unwrap();

    let error = ws.expect_event("error").await.unwrap();
    assert_eq!(error["message"], json!("Message content cannot be empty"));
    assert_eq!(server.store.message_create_calls(), 0);
}

#[tokio::test]
async fn test_unknown_event_keeps_connection_alive() {
    let server = TestServer::start().await.unwrap();
    let user = server.register_user("Mal", "Formed");
    let convo = Uuid::new_v4();
    server.store.add_conversation(convo);
    server.store.add_participant(convo, user.id);

    let mut ws = server.connect_user(&user).await.unwrap();

    ws.send_json(json!({ "event": "reboot_server", "data": {} }))
        .await
        .unwrap();
    let error = ws.expect_event("error").await.unwrap();
    assert_eq!(error["message"], json!("Invalid message format"));

    // The gateway is still usable after the rejection
    ws.join(convo).await.unwrap();
    ws.expect_event("conversation_joined").await.unwrap();
}
