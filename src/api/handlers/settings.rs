use crate::AppState;
use crate::api::error::AppError;
use crate::config::CdnSettings;
use crate::services::settings::{SettingsService, UpdateSettingsRequest};
use axum::{Json, extract::State};

#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Current CDN settings (secret omitted)", body = CdnSettings)
    ),
    tag = "admin"
)]
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<CdnSettings>, AppError> {
    Ok(Json(SettingsService::load(&state.db).await?))
}

#[utoipa::path(
    put,
    path = "/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Updated CDN settings", body = CdnSettings),
        (status = 400, description = "Invalid settings")
    ),
    tag = "admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<CdnSettings>, AppError> {
    Ok(Json(SettingsService::update(&state.db, req).await?))
}
