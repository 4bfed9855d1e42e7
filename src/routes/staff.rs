//! Employee and training-record routes.

use axum::extract::{Path, State};
use axum::response::Json;
use wire::SuccessResponse;
use wire::staff::{Employee, EmployeeUpdate, TrainingRecord};

use crate::error::{ApiError, ApiJson};
use crate::services::staff;
use crate::state::AppState;

/// `GET /api/employees`
pub async fn list_employees(State(state): State<AppState>) -> Result<Json<Vec<Employee>>, ApiError> {
    Ok(Json(staff::list_employees(&state.pool).await?))
}

/// `POST /api/employees`
pub async fn create_employee(
    State(state): State<AppState>,
    ApiJson(employee): ApiJson<Employee>,
) -> Result<Json<SuccessResponse>, ApiError> {
    staff::create_employee(&state.pool, &employee, state.now_ms()).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `PUT /api/employees/:id`
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<EmployeeUpdate>,
) -> Result<Json<SuccessResponse>, ApiError> {
    staff::update_employee(&state.pool, &id, &update).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `DELETE /api/employees/:id` — also removes the employee's training records.
pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    staff::delete_employee(&state.pool, &id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `GET /api/training-records`
pub async fn list_training(State(state): State<AppState>) -> Result<Json<Vec<TrainingRecord>>, ApiError> {
    Ok(Json(staff::list_training(&state.pool).await?))
}

/// `POST /api/training-records`
pub async fn create_training(
    State(state): State<AppState>,
    ApiJson(record): ApiJson<TrainingRecord>,
) -> Result<Json<SuccessResponse>, ApiError> {
    staff::create_training(&state.pool, &record, state.now_ms()).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `DELETE /api/training-records/:id`
pub async fn delete_training(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    staff::delete_training(&state.pool, &id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
#[path = "staff_test.rs"]
mod tests;
