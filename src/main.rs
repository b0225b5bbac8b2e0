use cdn_attachment::config::CdnConfig;
use cdn_attachment::infrastructure::{database, storage};
use cdn_attachment::services::key_generator::{KeyGenerator, TemplateKeyGenerator};
use cdn_attachment::services::offload::OffloadService;
use cdn_attachment::{AppState, create_app};
use clap::Parser;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What to run (serve, migrate)
    #[arg(short, long, default_value = "serve")]
    mode: String,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cdn_attachment=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting CDN attachment service [Mode: {}]...", args.mode);

    let config = CdnConfig::from_env();
    info!(
        "🗂️  Site path: {}, skipped doctypes: {:?}",
        config.site_path.display(),
        config.ignore_upload_for_doctype
    );

    let db = database::setup_database(&config).await?;
    let connector = storage::setup_storage(&config.settings).await;

    let key_generator = config.key_template.as_ref().map(|template| {
        info!("🔑 Custom key template: {}", template);
        Arc::new(TemplateKeyGenerator::new(template.clone())) as Arc<dyn KeyGenerator>
    });

    let offload = Arc::new(OffloadService::new(
        db.clone(),
        connector.clone(),
        key_generator,
        config.clone(),
    ));

    match args.mode.as_str() {
        "migrate" => {
            let migrated = offload.migrate_existing_files().await?;
            info!("👋 Migrated {} files, exiting.", migrated);
            return Ok(());
        }
        "serve" => {}
        other => anyhow::bail!("Unknown mode '{}', expected 'serve' or 'migrate'", other),
    }

    let state = AppState {
        db,
        connector,
        offload,
        config,
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ API Server listening on: http://0.0.0.0:{}", args.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
