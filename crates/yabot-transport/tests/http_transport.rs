//! HTTP transport tests against a mock Bot API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yabot_core::{Button, Keyboard, OutgoingText, Transport, TransportError};
use yabot_transport::{HttpTransport, HttpTransportConfig};

fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(HttpTransportConfig::new("test-token").with_base_url(server.uri()))
        .expect("client should build")
}

#[tokio::test]
async fn test_get_updates_sends_offset_limit_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/getUpdates"))
        .and(query_param("offset", "43"))
        .and(query_param("limit", "10"))
        .and(header("authorization", "OAuth test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "updates": [
                {"update_id": 43, "from": {"login": "alice"}, "text": "/start"},
                {"update_id": 44, "from": {"login": "bob"}, "text": "hi"},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let updates = transport(&server).get_updates(43, 10).await.unwrap();

    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1]["update_id"], 44);
}

#[tokio::test]
async fn test_missing_updates_field_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/getUpdates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let updates = transport(&server).get_updates(1, 10).await.unwrap();
    assert!(updates.is_empty());
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/getUpdates"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = transport(&server).get_updates(1, 10).await.unwrap_err();
    match err {
        TransportError::Status { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_garbage_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/getUpdates"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = transport(&server).get_updates(1, 10).await.unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)));
    assert!(!err.is_network());
}

#[tokio::test]
async fn test_slow_poll_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/getUpdates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"updates": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(
        HttpTransportConfig::new("test-token")
            .with_base_url(server.uri())
            .with_poll_timeout(Duration::from_millis(100)),
    )
    .unwrap();

    let err = transport.get_updates(1, 10).await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout));
    assert!(err.is_network());
}

#[tokio::test]
async fn test_unreachable_host_is_a_request_error() {
    let transport = HttpTransport::new(
        HttpTransportConfig::new("test-token").with_base_url("http://127.0.0.1:1"),
    )
    .unwrap();

    let err = transport.get_updates(1, 10).await.unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn test_send_text_flattens_keyboard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/sendText"))
        .and(header("authorization", "OAuth test-token"))
        .and(body_json(json!({
            "login": "alice",
            "text": "Hello! Choose an option:",
            "inline_keyboard": [
                {"text": "Name", "callback_data": {"cmd": "/ask_name"}},
                {"text": "Help", "callback_data": {"cmd": "/help"}},
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message_id": 77})))
        .expect(1)
        .mount(&server)
        .await;

    let keyboard = Keyboard::new()
        .row([Button::command("Name", "ask_name")])
        .row([Button::command("Help", "/help")]);
    let message = OutgoingText::new("alice", "Hello! Choose an option:", Some(keyboard));

    let id = transport(&server).send_text(&message).await.unwrap();
    assert_eq!(id, Some(77));
}

#[tokio::test]
async fn test_send_text_without_keyboard_omits_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/sendText"))
        .and(body_json(json!({"login": "carol", "text": "plain"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let id = transport(&server)
        .send_text(&OutgoingText::new("carol", "plain", None))
        .await
        .unwrap();
    assert_eq!(id, None);
}

#[tokio::test]
async fn test_send_text_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/sendText"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = transport(&server)
        .send_text(&OutgoingText::new("alice", "hi", None))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_send_text_requires_status_ok() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/sendText"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"message_id": 7})))
        .mount(&server)
        .await;

    let err = transport(&server)
        .send_text(&OutgoingText::new("alice", "hi", None))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 202, .. }));
}
