//! Chat API Tests
//!
//! History endpoint plus end-to-end WebSocket fan-out.

use axum::http::{header::AUTHORIZATION, StatusCode};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use forum_chat::application::dto::ChatMessageResponse;

use crate::common::TestApp;

fn texts(messages: &[ChatMessageResponse]) -> Vec<&str> {
    messages.iter().map(|m| m.text.as_str()).collect()
}

#[tokio::test]
async fn test_history_empty() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/v1/chat/messages").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Vec<ChatMessageResponse>>(), vec![]);
}

#[tokio::test]
async fn test_history_is_public_and_paged_newest_first() {
    let app = TestApp::new().await;
    let now = Utc::now();
    for (i, text) in ["first", "second", "third"].iter().enumerate() {
        app.seed("u1", text, now - Duration::minutes(10 - i as i64)).await;
    }

    let page = app
        .server
        .get("/api/v1/chat/messages")
        .add_query_param("limit", 2)
        .await
        .json::<Vec<ChatMessageResponse>>();
    assert_eq!(texts(&page), vec!["third", "second"]);

    let next = app
        .server
        .get("/api/v1/chat/messages")
        .add_query_param("limit", 2)
        .add_query_param("offset", 2)
        .await
        .json::<Vec<ChatMessageResponse>>();
    assert_eq!(texts(&next), vec!["first"]);

    let defaulted = app
        .server
        .get("/api/v1/chat/messages")
        .add_query_param("limit", 0)
        .add_query_param("offset", -3)
        .await
        .json::<Vec<ChatMessageResponse>>();
    assert_eq!(defaulted.len(), 3);
}

#[tokio::test]
async fn test_history_ignores_non_numeric_paging() {
    let app = TestApp::new().await;
    let now = Utc::now();
    for (i, text) in ["first", "second"].iter().enumerate() {
        app.seed("u1", text, now - Duration::minutes(10 - i as i64)).await;
    }

    let response = app
        .server
        .get("/api/v1/chat/messages")
        .add_query_param("limit", "abc")
        .add_query_param("offset", "later")
        .await;

    response.assert_status_ok();
    let page = response.json::<Vec<ChatMessageResponse>>();
    assert_eq!(texts(&page), vec!["second", "first"]);
}

#[tokio::test]
async fn test_socket_requires_token() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/v1/chat/ws").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], 10003);
}

#[tokio::test]
async fn test_socket_rejects_bad_token() {
    let app = TestApp::new().await;

    app.server
        .get("/api/v1/chat/ws")
        .add_query_param("token", "not-a-jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .get("/api/v1/chat/ws")
        .add_header(AUTHORIZATION, "Bearer not-a-jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    assert_eq!(app.state.hub.connection_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_broadcast_reaches_every_connection_with_sender_identity() {
    let app = TestApp::new().await;

    let mut alice = app
        .server
        .get_websocket("/api/v1/chat/ws")
        .add_query_param("token", app.token("alice"))
        .await
        .into_websocket()
        .await;
    let mut bob = app
        .server
        .get_websocket("/api/v1/chat/ws")
        .add_header(AUTHORIZATION, format!("Bearer {}", app.token("bob")))
        .await
        .into_websocket()
        .await;
    app.wait_for_connections(2).await;

    alice.send_json(&json!({ "text": "hello" })).await;

    let to_alice = alice.receive_json::<ChatMessageResponse>().await;
    let to_bob = bob.receive_json::<ChatMessageResponse>().await;
    assert_eq!(to_alice, to_bob);
    assert_eq!(to_bob.user_id, "alice");
    assert_eq!(to_bob.text, "hello");

    // Persisted before fan-out.
    let history = app
        .server
        .get("/api/v1/chat/messages")
        .await
        .json::<Vec<ChatMessageResponse>>();
    assert_eq!(history, vec![to_bob]);
}

#[tokio::test]
async fn test_late_joiner_receives_history_oldest_first() {
    let app = TestApp::new().await;

    let mut alice = app
        .server
        .get_websocket("/api/v1/chat/ws")
        .add_query_param("token", app.token("alice"))
        .await
        .into_websocket()
        .await;
    app.wait_for_connections(1).await;

    for text in ["one", "two"] {
        alice.send_json(&json!({ "text": text })).await;
        alice.receive_json::<ChatMessageResponse>().await;
    }

    let mut carol = app
        .server
        .get_websocket("/api/v1/chat/ws")
        .add_query_param("token", app.token("carol"))
        .await
        .into_websocket()
        .await;

    let first = carol.receive_json::<ChatMessageResponse>().await;
    let second = carol.receive_json::<ChatMessageResponse>().await;
    assert_eq!(texts(&[first, second]), vec!["one", "two"]);
}

#[tokio::test]
async fn test_invalid_frame_drops_connection_without_persisting() {
    let app = TestApp::new().await;

    let mut alice = app
        .server
        .get_websocket("/api/v1/chat/ws")
        .add_query_param("token", app.token("alice"))
        .await
        .into_websocket()
        .await;
    app.wait_for_connections(1).await;

    alice.send_text(r#"{"text":""}"#).await;
    app.wait_for_connections(0).await;

    let history = app
        .server
        .get("/api/v1/chat/messages")
        .await
        .json::<Vec<ChatMessageResponse>>();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_oversized_frame_drops_connection() {
    let app = TestApp::new().await;

    let mut alice = app
        .server
        .get_websocket("/api/v1/chat/ws")
        .add_query_param("token", app.token("alice"))
        .await
        .into_websocket()
        .await;
    app.wait_for_connections(1).await;

    alice
        .send_json(&json!({ "text": "x".repeat(1024) }))
        .await;

    app.wait_for_connections(0).await;
}
