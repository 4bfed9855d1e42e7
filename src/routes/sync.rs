//! State document routes.
//!
//! `GET /api/state` returns the stored document (or `null`), `POST /api/state`
//! replaces it. The pushing device identifies itself with `x-device-id`;
//! a missing header is recorded as `unknown`.

use std::convert::Infallible;

use axum::extract::State;
use axum::http::request::Parts;
use axum::response::Json;
use serde_json::{Map, Value};
use wire::{DEVICE_ID_HEADER, PushStateResponse, SharedStateDocument};

use crate::error::{ApiError, ApiJson};
use crate::services::document;
use crate::state::AppState;

/// Recorded origin when a push carries no device header.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// Device id taken from the `x-device-id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginDevice(pub String);

impl<S> axum::extract::FromRequestParts<S> for OriginDevice
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(DEVICE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_DEVICE);
        Ok(Self(id.to_owned()))
    }
}

/// `GET /api/state` — current document or `null`.
pub async fn get_state(State(state): State<AppState>) -> Result<Json<Option<SharedStateDocument>>, ApiError> {
    Ok(Json(document::fetch_document(&state.pool).await?))
}

/// `POST /api/state` — replace the document, stamping server metadata.
pub async fn push_state(
    State(state): State<AppState>,
    OriginDevice(device_id): OriginDevice,
    ApiJson(content): ApiJson<Map<String, Value>>,
) -> Result<Json<PushStateResponse>, ApiError> {
    let stamp = document::push_document(&state, content, &device_id).await?;
    Ok(Json(PushStateResponse { success: true, last_modified: Some(stamp) }))
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
