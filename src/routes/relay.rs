//! Signaling, chat and notification relay routes.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use wire::{
    ChatMessage, ChatMessagesResponse, Notification, SendNotificationRequest, SendNotificationResponse,
    SignalingMessage, SignalingResponse, SuccessResponse,
};

use crate::error::{ApiError, ApiJson};
use crate::services::{chat, notification, require};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalingQuery {
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: Option<String>,
}

// =============================================================================
// SIGNALING
// =============================================================================

/// `GET /api/signaling?deviceId=` — drain messages addressed to the device.
/// Without a device id nothing is drained and the list is empty.
pub async fn receive_signaling(
    State(state): State<AppState>,
    Query(query): Query<SignalingQuery>,
) -> Json<SignalingResponse> {
    let Some(device_id) = query.device_id.as_deref().and_then(|id| require(id, "deviceId").ok()) else {
        return Json(SignalingResponse::default());
    };
    let messages = state.signaling.receive(device_id, state.now_ms());
    Json(SignalingResponse { messages })
}

/// `POST /api/signaling` — queue a message for its destination device.
pub async fn send_signaling(
    State(state): State<AppState>,
    ApiJson(message): ApiJson<SignalingMessage>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require(&message.to, "to").map_err(missing)?;
    require(&message.from, "from").map_err(missing)?;
    state.signaling.send(message);
    Ok(Json(SuccessResponse::ok()))
}

fn missing(field: &'static str) -> ApiError {
    notification::RelayError::MissingField(field).into()
}

// =============================================================================
// CHAT
// =============================================================================

/// `GET /api/messages` — newest first, capped.
pub async fn list_messages(State(state): State<AppState>) -> Result<Json<ChatMessagesResponse>, ApiError> {
    let messages = chat::list(&state.pool).await?;
    Ok(Json(ChatMessagesResponse { messages }))
}

/// `POST /api/messages` — store a message and notify the recipient.
pub async fn send_message(
    State(state): State<AppState>,
    ApiJson(message): ApiJson<ChatMessage>,
) -> Result<Json<SuccessResponse>, ApiError> {
    chat::send(&state.pool, &message, state.now_ms()).await?;
    Ok(Json(SuccessResponse::ok()))
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// `POST /api/notifications`
pub async fn send_notification(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>, ApiError> {
    let notification_id = notification::send(&state.pool, &request, state.now_ms()).await?;
    Ok(Json(SendNotificationResponse { success: true, notification_id }))
}

/// `GET /api/notifications/:deviceId?unreadOnly=true`
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let unread_only = query.unread_only.as_deref() == Some("true");
    Ok(Json(notification::list(&state.pool, &device_id, unread_only).await?))
}

/// `PATCH /api/notifications/:id/read`
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    notification::mark_read(&state.pool, &id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `DELETE /api/notifications/:id`
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    notification::delete(&state.pool, &id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
