use crate::config::CdnSettings;
use crate::services::storage::S3Connector;
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(settings: &CdnSettings) -> Arc<S3Connector> {
    info!(
        "☁️  S3 Storage: {} (Bucket: {})",
        settings.endpoint_url(),
        settings.bucket_name
    );

    // Region, endpoint and credentials from the settings table are layered on per call
    let aws_config = aws_config::from_env()
        .region(Region::new(settings.region_name.clone()))
        .load()
        .await;

    let connector = S3Connector::new(aws_config);

    let client = connector.client_for(settings);
    match client.head_bucket().bucket(&settings.bucket_name).send().await {
        Ok(_) => info!("✅ Bucket '{}' is reachable", settings.bucket_name),
        Err(e) => tracing::warn!(
            "⚠️  Bucket '{}' is not reachable yet: {}",
            settings.bucket_name,
            e
        ),
    }

    Arc::new(connector)
}
