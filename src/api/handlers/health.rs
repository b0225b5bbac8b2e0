use crate::AppState;
use crate::services::settings::SettingsService;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = if state.db.ping().await.is_ok() {
        "connected"
    } else {
        "disconnected"
    };

    let storage_status = match SettingsService::load(&state.db).await {
        Ok(settings) => {
            let storage = state.connector.connect(&settings);
            if storage.file_exists("health-check").await.is_ok() {
                "connected"
            } else {
                "unreachable"
            }
        }
        Err(_) => "unconfigured",
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        database: db_status.to_string(),
        storage: storage_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/method/ping",
    responses(
        (status = 200, description = "Liveness check", body = String)
    ),
    tag = "system"
)]
pub async fn ping() -> &'static str {
    "pong"
}
