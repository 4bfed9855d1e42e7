//! ERP proxy routes under `/api/fulcrum`.
//!
//! Reads always answer 200; failures travel in the payload's `error` field.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use wire::erp::{
    ClockInRequest, ClockOutRequest, ClockResponse, ErpEmployeesPayload, InventoryPayload, OperationsPayload,
    ProductionPayload, TimersPayload,
};

use crate::error::ApiJson;
use crate::services::erp::{self, ErpError};
use crate::state::AppState;

/// `GET /api/fulcrum/inventory`
pub async fn inventory(State(state): State<AppState>) -> Json<InventoryPayload> {
    Json(erp::inventory(state.erp.as_deref(), state.now_ms()).await)
}

/// `GET /api/fulcrum/operations`
pub async fn operations(State(state): State<AppState>) -> Json<OperationsPayload> {
    Json(erp::operations(state.erp.as_deref(), state.now_ms()).await)
}

/// `GET /api/fulcrum/production`
pub async fn production(State(state): State<AppState>) -> Json<ProductionPayload> {
    Json(erp::production(state.erp.as_deref(), state.now_ms()).await)
}

/// `GET /api/fulcrum/employees`
pub async fn employees(State(state): State<AppState>) -> Json<ErpEmployeesPayload> {
    Json(erp::employees(state.erp.as_deref()).await)
}

/// `GET /api/fulcrum/timeclock/timers`
pub async fn timers(State(state): State<AppState>) -> Json<TimersPayload> {
    Json(erp::timers(state.erp.as_deref()).await)
}

/// `POST /api/fulcrum/timeclock/clock-in`
pub async fn clock_in(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClockInRequest>,
) -> (StatusCode, Json<ClockResponse>) {
    clock_reply(erp::clock_in(state.erp.as_deref(), &request, state.now_ms()).await)
}

/// `POST /api/fulcrum/timeclock/clock-out`
pub async fn clock_out(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClockOutRequest>,
) -> (StatusCode, Json<ClockResponse>) {
    clock_reply(erp::clock_out(state.erp.as_deref(), &request, state.now_ms()).await)
}

fn clock_reply(result: Result<ClockResponse, ErpError>) -> (StatusCode, Json<ClockResponse>) {
    match result {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e @ ErpError::MissingField(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ClockResponse { success: false, error: Some(e.to_string()), ..ClockResponse::default() }),
        ),
        Err(e) => (
            StatusCode::OK,
            Json(ClockResponse { success: false, error: Some(e.to_string()), ..ClockResponse::default() }),
        ),
    }
}

#[cfg(test)]
#[path = "erp_test.rs"]
mod tests;
