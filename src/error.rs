//! HTTP error mapping.
//!
//! ERROR HANDLING
//! ==============
//! Handlers return `Result<_, ApiError>`. Client mistakes carry their message
//! through to the `{error}` body. Internal failures are logged with full
//! detail and answered with a fixed message so storage errors never leak.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use tracing::error;
use wire::ErrorResponse;

use crate::services::devices::DeviceError;
use crate::services::document::StateError;
use crate::services::notices::NoticeError;
use crate::services::notification::RelayError;
use crate::services::staff::StaffError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(detail) => {
                error!(error = %detail, "request failed");
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn missing(field: &str) -> ApiError {
    ApiError::BadRequest(format!("Missing required field: {field}"))
}

impl From<StateError> for ApiError {
    fn from(err: StateError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::MissingField(field) => missing(field),
            RelayError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<DeviceError> for ApiError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::MissingField(field) => missing(field),
            DeviceError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<StaffError> for ApiError {
    fn from(err: StaffError) -> Self {
        match err {
            StaffError::MissingField(field) => missing(field),
            StaffError::UnknownEmployee(id) => Self::BadRequest(format!("Unknown employee: {id}")),
            StaffError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<NoticeError> for ApiError {
    fn from(err: NoticeError) -> Self {
        match err {
            NoticeError::NotPdf | NoticeError::InvalidName(_) => Self::BadRequest(err.to_string()),
            NoticeError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            NoticeError::NotFound(_) => Self::NotFound("File not found".to_owned()),
            NoticeError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

/// `Json` extractor whose rejection is an `ApiError::BadRequest` with a
/// JSON `{error}` body instead of axum's plain-text rejection.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(&rejection)),
        }
    }
}

fn rejection_to_error(rejection: &JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
