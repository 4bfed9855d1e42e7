//! PDF notice upload and delete routes.

use axum::extract::{Multipart, State};
use axum::response::Json;
use wire::{DeletePdfRequest, SuccessResponse, UploadPdfResponse};

use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// `POST /api/upload-pdf` — multipart upload, field `file`.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadPdfResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;

        let url = state
            .pdfs
            .save(file_name.as_deref(), content_type.as_deref(), &data, state.now_ms())
            .await?;
        return Ok(Json(UploadPdfResponse { url }));
    }

    Err(ApiError::BadRequest("No file uploaded".to_owned()))
}

/// `DELETE /api/delete-pdf` — body `{url}`.
pub async fn delete(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DeletePdfRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Some(url) = body.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return Err(ApiError::BadRequest("Missing URL".to_owned()));
    };
    state.pdfs.delete(url).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
#[path = "notices_test.rs"]
mod tests;
