//! Device registry routes.

use axum::extract::{Path, State};
use axum::response::Json;
use wire::{Device, RegisterDeviceRequest, RenameDeviceRequest, SuccessResponse};

use crate::error::{ApiError, ApiJson};
use crate::services::devices;
use crate::state::AppState;

/// `POST /api/devices/register` — insert or refresh a device.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterDeviceRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    devices::register(&state.pool, &body.device_id, &body.device_name, state.now_ms()).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `PATCH /api/devices/:deviceId` — rename. Unknown ids succeed unchanged.
pub async fn rename(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    ApiJson(body): ApiJson<RenameDeviceRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    devices::rename(&state.pool, &device_id, &body.device_name, state.now_ms()).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `GET /api/devices` — most recently seen first.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(devices::list(&state.pool).await?))
}

#[cfg(test)]
#[path = "devices_test.rs"]
mod tests;
