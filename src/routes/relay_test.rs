use crate::routes::test_support::{call, get, post};
use crate::state::test_helpers;
use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn signaling_is_consumed_on_read() {
    let (state, clock) = test_helpers::test_app_state(5000).await;
    let offer = json!({"id": "s1", "from": "dev-a", "to": "dev-b", "type": "offer", "data": {"sdp": "v=0"}, "timestamp": 5000});

    let (status, body) = post(&state, "/api/signaling", offer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    clock.set(5001);
    let (_, body) = get(&state, "/api/signaling?deviceId=dev-b").await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"][0]["type"], "offer");

    clock.set(5002);
    let (_, body) = get(&state, "/api/signaling?deviceId=dev-b").await;
    assert_eq!(body, json!({"messages": []}));
}

#[tokio::test]
async fn signaling_without_device_id_returns_empty_and_drains_nothing() {
    let (state, _clock) = test_helpers::test_app_state(10).await;
    post(&state, "/api/signaling", json!({"id": "s1", "from": "a", "to": "b", "type": "call-request", "data": null, "timestamp": 10})).await;

    let (_, body) = get(&state, "/api/signaling").await;
    assert_eq!(body, json!({"messages": []}));
    assert_eq!(state.signaling.len(), 1);
}

#[tokio::test]
async fn signaling_rejects_unknown_type() {
    let (state, _clock) = test_helpers::test_app_state(10).await;
    let (status, _) = post(&state, "/api/signaling", json!({"id": "s1", "from": "a", "to": "b", "type": "hangup", "timestamp": 10})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.signaling.is_empty());
}

#[tokio::test]
async fn chat_message_creates_recipient_notification() {
    let (state, _clock) = test_helpers::test_app_state(100).await;
    let (status, _) = post(
        &state,
        "/api/messages",
        json!({"id": "m1", "from": "dev-a", "to": "dev-b", "text": "Truck at dock 2", "timestamp": 99}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&state, "/api/messages").await;
    assert_eq!(body["messages"][0]["text"], "Truck at dock 2");

    let (_, inbox) = get(&state, "/api/notifications/dev-b?unreadOnly=true").await;
    assert_eq!(inbox[0]["type"], "message");
    assert_eq!(inbox[0]["title"], "New Message");
    assert_eq!(inbox[0]["message"], "Truck at dock 2");
}

#[tokio::test]
async fn chat_message_missing_fields_is_bad_request() {
    let (state, _clock) = test_helpers::test_app_state(100).await;
    let (status, body) = post(&state, "/api/messages", json!({"id": "m1", "from": "dev-a", "to": "dev-b", "text": "", "timestamp": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: text");
}

#[tokio::test]
async fn call_notification_round_trip() {
    let (state, clock) = test_helpers::test_app_state(100).await;
    let (status, sent) = post(
        &state,
        "/api/notifications",
        json!({
            "toDevice": "dev-c",
            "fromDevice": "dev-a",
            "type": "call",
            "title": "Incoming call from Front Desk",
            "data": {"offer": {"type": "offer", "sdp": "v=0"}, "fromName": "Front Desk"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["success"], true);
    let id = sent["notificationId"].as_str().unwrap().to_owned();
    assert!(id.starts_with("notif_100_"));

    clock.set(101);
    let (_, unread) = get(&state, "/api/notifications/dev-c?unreadOnly=true").await;
    assert_eq!(unread[0]["data"]["fromName"], "Front Desk");
    assert_eq!(unread[0]["read"], false);

    let (status, _) = call(&state, Method::PATCH, &format!("/api/notifications/{id}/read"), None, &[]).await;
    assert_eq!(status, StatusCode::OK);

    clock.set(103);
    let (_, unread) = get(&state, "/api/notifications/dev-c?unreadOnly=true").await;
    assert_eq!(unread, json!([]));
    let (_, all) = get(&state, "/api/notifications/dev-c").await;
    assert_eq!(all[0]["read"], true);

    let (status, _) = call(&state, Method::DELETE, &format!("/api/notifications/{id}"), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    let (_, all) = get(&state, "/api/notifications/dev-c").await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn notification_missing_title_is_bad_request() {
    let (state, _clock) = test_helpers::test_app_state(1).await;
    let (status, _) = post(
        &state,
        "/api/notifications",
        json!({"toDevice": "dev-c", "fromDevice": "dev-a", "type": "call", "title": ""}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notification_listing_uses_row_column_names() {
    let (state, _clock) = test_helpers::test_app_state(100).await;
    post(
        &state,
        "/api/notifications",
        json!({"toDevice": "dev-c", "fromDevice": "dev-a", "type": "call", "title": "Incoming call from A"}),
    )
    .await;

    let (status, listed) = get(&state, "/api/notifications/dev-c").await;
    assert_eq!(status, StatusCode::OK);
    let mut keys: Vec<_> = listed[0].as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["created_at", "data", "from_device", "id", "message", "read", "title", "to_device", "type"]
    );
    assert_eq!(listed[0]["from_device"], "dev-a");
    assert_eq!(listed[0]["data"], serde_json::Value::Null);
}
