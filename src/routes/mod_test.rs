use super::test_support::{call, get};
use crate::state::test_helpers;
use axum::http::{Method, StatusCode};

#[tokio::test]
async fn health_reports_ok_with_server_time() {
    let (state, _clock) = test_helpers::test_app_state(61_000).await;
    let (status, body) = get(&state, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timestamp"], "1970-01-01T00:01:01Z");
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let (state, _clock) = test_helpers::test_app_state(0).await;
    let (status, _) = call(
        &state,
        Method::OPTIONS,
        "/api/state",
        None,
        &[("origin", "http://kiosk.local"), ("access-control-request-method", "POST")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (state, _clock) = test_helpers::test_app_state(0).await;
    let (status, _) = get(&state, "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
