use crate::AppState;
use crate::api::error::AppError;
use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use utoipa::IntoParams;

pub const KEY_NOT_FOUND_BODY: &str = "Key not found.";

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerateFileQuery {
    /// Storage key of the private object
    pub key: Option<String>,
    /// Download name sent back as content-disposition
    pub file_name: Option<String>,
}

/// Redirects to a signed URL for a private object.
///
/// A request without a key gets a plain 200 text body, not an error status.
#[utoipa::path(
    get,
    path = "/api/method/cdn_attachment.generate_file",
    params(GenerateFileQuery),
    responses(
        (status = 302, description = "Redirect to a signed URL"),
        (status = 200, description = "No key supplied", body = String)
    ),
    tag = "files"
)]
pub async fn generate_file(
    State(state): State<AppState>,
    Query(query): Query<GenerateFileQuery>,
) -> Result<Response, AppError> {
    let Some(key) = query.key.filter(|k| !k.is_empty()) else {
        return Ok(KEY_NOT_FOUND_BODY.into_response());
    };

    let signed_url = state
        .offload
        .signed_url(&key, query.file_name.as_deref())
        .await?;

    tracing::info!("📎 Signed redirect for {}", key);

    Ok((StatusCode::FOUND, [(header::LOCATION, signed_url)]).into_response())
}
