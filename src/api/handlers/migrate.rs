use crate::AppState;
use crate::api::error::AppError;
use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct MigrateResponse {
    pub migrated: usize,
}

#[utoipa::path(
    post,
    path = "/migrate",
    responses(
        (status = 200, description = "All local files offloaded", body = MigrateResponse),
        (status = 417, description = "A file failed to upload; the run stopped there")
    ),
    tag = "admin"
)]
pub async fn migrate_existing_files(
    State(state): State<AppState>,
) -> Result<Json<MigrateResponse>, AppError> {
    let migrated = state.offload.migrate_existing_files().await?;
    Ok(Json(MigrateResponse { migrated }))
}
