use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use utoipa::ToSchema;

/// Name of the single settings row.
pub const SETTINGS_NAME: &str = "CDN File Attachment";

/// Signed URL lifetime used when the settings leave it unset or zero.
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 120;

/// Path of the redirect endpoint that serves private files.
pub const REDIRECT_PATH: &str = "/api/method/cdn_attachment.generate_file";

/// Folder written on every offloaded file record.
pub const ATTACHMENTS_FOLDER: &str = "Home/Attachments";

/// Bucket and access settings for the object store.
///
/// A snapshot of this struct is handed to every `CdnOperations` instance, so
/// changes made through the settings endpoint apply from the next call on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CdnSettings {
    pub bucket_name: String,
    pub region_name: String,
    /// Endpoint / CDN hostname, e.g. `digitaloceanspaces.com`
    pub cdn_url: Option<String>,
    pub cdn_key: Option<String>,
    #[serde(skip_serializing)]
    pub cdn_secret: Option<String>,
    /// Optional prefix for every generated key
    pub folder_name: Option<String>,
    pub signed_url_expiry_time: Option<u64>,
    pub delete_file_from_cloud: bool,
}

impl Default for CdnSettings {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            region_name: "us-east-1".to_string(),
            cdn_url: None,
            cdn_key: None,
            cdn_secret: None,
            folder_name: None,
            signed_url_expiry_time: None,
            delete_file_from_cloud: false,
        }
    }
}

impl CdnSettings {
    /// Endpoint the storage client talks to; also the base of public URLs.
    pub fn endpoint_url(&self) -> String {
        match self.cdn_url.as_deref().filter(|u| !u.is_empty()) {
            Some(cdn_url) => format!(
                "https://{}.s3.{}.{}",
                self.bucket_name, self.region_name, cdn_url
            ),
            None => format!("https://s3.{}.amazonaws.com", self.region_name),
        }
    }

    pub fn has_custom_endpoint(&self) -> bool {
        self.cdn_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    pub fn signed_url_expiry(&self) -> Duration {
        let secs = self
            .signed_url_expiry_time
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECS);
        Duration::from_secs(secs)
    }

    /// Static credentials, only when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.cdn_key.as_deref(), self.cdn_secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some((key, secret))
            }
            _ => None,
        }
    }

    fn from_env_with(default: Self) -> Self {
        Self {
            bucket_name: env::var("CDN_BUCKET_NAME").unwrap_or(default.bucket_name),
            region_name: env::var("CDN_REGION_NAME").unwrap_or(default.region_name),
            cdn_url: env::var("CDN_URL").ok().or(default.cdn_url),
            cdn_key: env::var("CDN_KEY").ok().or(default.cdn_key),
            cdn_secret: env::var("CDN_SECRET").ok().or(default.cdn_secret),
            folder_name: env::var("CDN_FOLDER_NAME").ok().or(default.folder_name),
            signed_url_expiry_time: env::var("CDN_SIGNED_URL_EXPIRY_TIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(default.signed_url_expiry_time),
            delete_file_from_cloud: env::var("CDN_DELETE_FILE_FROM_CLOUD")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.delete_file_from_cloud),
        }
    }
}

/// Process-level configuration for the offload service
#[derive(Debug, Clone)]
pub struct CdnConfig {
    /// Database URL (default: "sqlite://cdn_attachment.db?mode=rwc")
    pub database_url: String,

    /// Site directory holding `public/files` and `private/files` (default: "./site")
    pub site_path: PathBuf,

    /// Owning record types whose uploads stay local (default: ["Data Import"])
    pub ignore_upload_for_doctype: Vec<String>,

    /// Template for the pluggable key generator, e.g. "{parent_type}/{parent_id}/{file_name}"
    pub key_template: Option<String>,

    /// Settings written to the settings table on first start
    pub settings: CdnSettings,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://cdn_attachment.db?mode=rwc".to_string(),
            site_path: PathBuf::from("./site"),
            ignore_upload_for_doctype: vec!["Data Import".to_string()],
            key_template: None,
            settings: CdnSettings::default(),
        }
    }
}

impl CdnConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            site_path: env::var("SITE_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.site_path),

            ignore_upload_for_doctype: env::var("CDN_IGNORE_UPLOAD_FOR_DOCTYPE")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.ignore_upload_for_doctype),

            key_template: env::var("CDN_KEY_TEMPLATE")
                .ok()
                .filter(|t| !t.trim().is_empty()),

            settings: CdnSettings::from_env_with(default.settings),
        }
    }

    /// Create config for development (in-memory database, local MinIO bucket)
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            site_path: PathBuf::from("./site"),
            ignore_upload_for_doctype: vec!["Data Import".to_string()],
            key_template: None,
            settings: CdnSettings {
                bucket_name: "attachments".to_string(),
                region_name: "us-east-1".to_string(),
                delete_file_from_cloud: true,
                ..CdnSettings::default()
            },
        }
    }
}
