use crate::AppState;
use crate::api::error::AppError;
use crate::services::offload::OffloadOutcome;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct FileUploadedEvent {
    /// Name of the file record that was just created
    pub name: String,
}

#[derive(Serialize, ToSchema)]
pub struct FileUploadedResponse {
    /// "offloaded" or "skipped"
    pub status: String,
    pub key: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct FileDeletedEvent {
    pub name: Option<String>,
    /// Storage key of the deleted file; looked up from `name` when absent
    pub content_hash: Option<String>,
}

#[utoipa::path(
    post,
    path = "/hooks/file/uploaded",
    request_body = FileUploadedEvent,
    responses(
        (status = 200, description = "File offloaded or skipped", body = FileUploadedResponse),
        (status = 404, description = "File record not found"),
        (status = 417, description = "Upload to the object store failed")
    ),
    tag = "hooks"
)]
pub async fn file_uploaded(
    State(state): State<AppState>,
    Json(event): Json<FileUploadedEvent>,
) -> Result<Json<FileUploadedResponse>, AppError> {
    let outcome = state.offload.file_upload_to_cdn(&event.name).await?;

    let response = match outcome {
        OffloadOutcome::Offloaded { key, file_url } => FileUploadedResponse {
            status: "offloaded".to_string(),
            key: Some(key),
            file_url: Some(file_url),
        },
        OffloadOutcome::Skipped { .. } => FileUploadedResponse {
            status: "skipped".to_string(),
            key: None,
            file_url: None,
        },
    };

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/hooks/file/deleted",
    request_body = FileDeletedEvent,
    responses(
        (status = 204, description = "Delete handled"),
        (status = 400, description = "Neither name nor content_hash given"),
        (status = 417, description = "Object store denied the delete")
    ),
    tag = "hooks"
)]
pub async fn file_deleted(
    State(state): State<AppState>,
    Json(event): Json<FileDeletedEvent>,
) -> Result<StatusCode, AppError> {
    let key = match (event.content_hash, event.name) {
        (Some(key), _) => Some(key),
        (None, Some(name)) => state.offload.storage_key_for(&name).await?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either name or content_hash is required".to_string(),
            ));
        }
    };

    state
        .offload
        .delete_from_cloud(key.as_deref().unwrap_or_default())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
