use crate::config::CdnConfig;
use crate::entities::{cdn_settings, doctype_meta, files};
use crate::services::settings::SettingsService;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

pub async fn setup_database(config: &CdnConfig) -> anyhow::Result<DatabaseConnection> {
    info!("📂 Database: {}", config.database_url);

    let mut opt = ConnectOptions::new(&config.database_url);
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    if SettingsService::seed(&db, &config.settings).await? {
        info!("🌱 Seeded CDN settings from environment");
    }

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    let stmts = vec![
        (
            "files",
            schema
                .create_table_from_entity(files::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "doctype_meta",
            schema
                .create_table_from_entity(doctype_meta::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cdn_settings",
            schema
                .create_table_from_entity(cdn_settings::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        match db.execute(stmt).await {
            Ok(_) => info!("   - Table '{}' checked/created", name),
            Err(e) => tracing::warn!("   - Failed to create table '{}': {}", name, e),
        }
    }

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_files_content_hash ON files(content_hash)",
        "CREATE INDEX IF NOT EXISTS idx_files_attached_to ON files(attached_to_doctype, attached_to_name)",
    ];

    for query in indexes {
        match db
            .execute(sea_orm::Statement::from_string(builder, query.to_owned()))
            .await
        {
            Ok(_) => info!("   - Executed schema update: {}", query),
            Err(e) => tracing::warn!("   - Schema update warning: {} -> {}", query, e),
        }
    }

    Ok(())
}
