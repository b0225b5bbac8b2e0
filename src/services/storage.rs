use crate::config::CdnSettings;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Options attached to a single object upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOptions {
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
    /// Grant `public-read` on the object
    pub public_read: bool,
}

/// Raised by `delete_object` when the store refuses the request.
///
/// Travels inside `anyhow::Error`; callers recover it with `downcast_ref`.
#[derive(Debug, Clone)]
pub struct AccessDeniedError {
    pub key: String,
}

impl std::fmt::Display for AccessDeniedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "access denied for object '{}'", self.key)
    }
}

impl std::error::Error for AccessDeniedError {}

#[async_trait]
pub trait StorageService: Send + Sync {
    async fn upload_path(&self, path: &Path, key: &str, options: UploadOptions) -> Result<()>;
    async fn delete_object(&self, key: &str) -> Result<()>;
    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;
    async fn file_exists(&self, key: &str) -> Result<bool>;
    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
        content_disposition: Option<&str>,
    ) -> Result<String>;
}

/// Builds a storage client for a settings snapshot.
pub trait StorageConnector: Send + Sync {
    fn connect(&self, settings: &CdnSettings) -> Arc<dyn StorageService>;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn upload_path(&self, path: &Path, key: &str, options: UploadOptions) -> Result<()> {
        let body = ByteStream::from_path(path).await?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(&options.content_type)
            .body(body);

        for (name, value) in &options.metadata {
            request = request.metadata(name, value);
        }
        if options.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        if let Err(e) = request.send().await {
            tracing::error!(
                "S3 put_object failed: bucket={}, key={}, error={:?}",
                self.bucket,
                key,
                e
            );
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let res = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) => {
                let denied = e.as_service_error().and_then(|se| se.code()) == Some("AccessDenied")
                    || e.raw_response().map(|r| r.status().as_u16()) == Some(403);
                if denied {
                    Err(anyhow!(AccessDeniedError {
                        key: key.to_string(),
                    }))
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        let data = res.body.collect().await?.to_vec();
        Ok(data)
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow!(service_error))
                }
            }
        }
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
        content_disposition: Option<&str>,
    ) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)?;

        let mut request = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(disposition) = content_disposition {
            request = request.response_content_disposition(disposition);
        }

        let presigned = request.presigned(presigning).await?;
        Ok(presigned.uri().to_string())
    }
}

/// Layers per-call settings on top of an AWS config loaded once at startup.
pub struct S3Connector {
    base: aws_config::SdkConfig,
}

impl S3Connector {
    pub fn new(base: aws_config::SdkConfig) -> Self {
        Self { base }
    }

    pub fn client_for(&self, settings: &CdnSettings) -> Client {
        let mut builder = aws_sdk_s3::config::Builder::from(&self.base);

        if !settings.region_name.is_empty() {
            builder = builder.region(Region::new(settings.region_name.clone()));
        }
        if settings.has_custom_endpoint() {
            builder = builder
                .endpoint_url(settings.endpoint_url())
                .force_path_style(true);
        }
        if let Some((key, secret)) = settings.credentials() {
            builder = builder.credentials_provider(Credentials::new(
                key, secret, None, None, "static",
            ));
        }

        Client::from_conf(builder.build())
    }
}

impl StorageConnector for S3Connector {
    fn connect(&self, settings: &CdnSettings) -> Arc<dyn StorageService> {
        Arc::new(S3StorageService::new(
            self.client_for(settings),
            settings.bucket_name.clone(),
        ))
    }
}
