pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::{CdnConfig, REDIRECT_PATH};
use crate::services::offload::OffloadService;
use crate::services::storage::StorageConnector;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::hooks::file_uploaded,
        api::handlers::hooks::file_deleted,
        api::handlers::generate_file::generate_file,
        api::handlers::migrate::migrate_existing_files,
        api::handlers::settings::get_settings,
        api::handlers::settings::update_settings,
        api::handlers::health::health_check,
        api::handlers::health::ping,
    ),
    components(
        schemas(
            api::handlers::hooks::FileUploadedEvent,
            api::handlers::hooks::FileUploadedResponse,
            api::handlers::hooks::FileDeletedEvent,
            api::handlers::migrate::MigrateResponse,
            api::handlers::health::HealthResponse,
            services::settings::UpdateSettingsRequest,
            config::CdnSettings,
        )
    ),
    tags(
        (name = "hooks", description = "File lifecycle hooks"),
        (name = "files", description = "Private file access"),
        (name = "admin", description = "Settings and migration"),
        (name = "system", description = "Liveness and health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub connector: Arc<dyn StorageConnector>,
    pub offload: Arc<OffloadService>,
    pub config: CdnConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/ping", get(api::handlers::health::ping))
        .route("/api/method/ping", get(api::handlers::health::ping))
        .route(REDIRECT_PATH, get(api::handlers::generate_file::generate_file))
        .route("/hooks/file/uploaded", post(api::handlers::hooks::file_uploaded))
        .route("/hooks/file/deleted", post(api::handlers::hooks::file_deleted))
        .route("/migrate", post(api::handlers::migrate::migrate_existing_files))
        .route(
            "/settings",
            get(api::handlers::settings::get_settings)
                .put(api::handlers::settings::update_settings),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .with_state(state)
}
