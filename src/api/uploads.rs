use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};

use crate::api::middleware::{
    auth::{AdminUser, AnyAuth},
    state::AppState,
};
use crate::error::{AppError, Result};
use crate::services::storage::{StoredFile, UploadCategory, UploadError};

const FILE_FIELD: &str = "file";

/// Accepts one multipart `file` field and stores it under the category
async fn upload(
    State(state): State<AppState>,
    auth: AnyAuth,
    Path(category): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredFile>)> {
    let category: UploadCategory = category.parse()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        let stored = state.uploads.save(category, &content_type, &bytes).await?;

        tracing::info!(
            uploaded_by = %auth.0.sub,
            category = category.as_str(),
            filename = %stored.filename,
            "Upload stored"
        );

        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(UploadError::MissingFile.into())
}

async fn delete_upload(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((category, filename)): Path<(String, String)>,
) -> Result<StatusCode> {
    let category: UploadCategory = category.parse()?;
    state.uploads.delete(category, &filename).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/uploads/:category", post(upload))
        .route("/api/v1/uploads/:category/:filename", delete(delete_upload))
}
