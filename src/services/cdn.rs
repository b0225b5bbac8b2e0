use crate::config::CdnSettings;
use crate::services::key_generator::KeyGenerator;
use crate::services::storage::{AccessDeniedError, StorageService, UploadOptions};
use crate::utils::validation::sanitize_file_name;
use chrono::{Local, NaiveDate};
use rand::Rng;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TOKEN_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum CdnError {
    #[error("File Upload Failed. Please try again.")]
    UploadFailed {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Access denied: Could not delete file")]
    AccessDenied { key: String },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl CdnError {
    /// Errors meant to be shown to the person who triggered the action.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, CdnError::UploadFailed { .. } | CdnError::AccessDenied { .. })
    }
}

pub fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

/// Falls back to `application/octet-stream` for unknown extensions.
pub fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}

/// Key derivation, upload, delete and URL resolution against one bucket.
pub struct CdnOperations {
    storage: Arc<dyn StorageService>,
    settings: CdnSettings,
    key_generator: Option<Arc<dyn KeyGenerator>>,
}

impl CdnOperations {
    pub fn new(
        storage: Arc<dyn StorageService>,
        settings: CdnSettings,
        key_generator: Option<Arc<dyn KeyGenerator>>,
    ) -> Self {
        Self {
            storage,
            settings,
            key_generator,
        }
    }

    pub fn settings(&self) -> &CdnSettings {
        &self.settings
    }

    pub fn generate_key(&self, file_name: &str, parent_type: &str, parent_id: Option<&str>) -> String {
        self.generate_key_on(file_name, parent_type, parent_id, Local::now().date_naive())
    }

    pub fn generate_key_on(
        &self,
        file_name: &str,
        parent_type: &str,
        parent_id: Option<&str>,
        date: NaiveDate,
    ) -> String {
        if let Some(generator) = &self.key_generator {
            match generator.generate(file_name, parent_type, parent_id) {
                Ok(Some(key)) => {
                    let key = key.trim_matches('/');
                    if !key.is_empty() {
                        return key.to_string();
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "⚠️  Key generator failed for {} ({}): {:#}. Using default key layout.",
                        file_name,
                        parent_type,
                        e
                    );
                }
            }
        }

        let file_name = sanitize_file_name(file_name);
        let key = format!(
            "{}/{}/{}_{}",
            date.format("%Y/%m/%d"),
            parent_type,
            random_token(),
            file_name
        );

        match self.settings.folder_name.as_deref().filter(|f| !f.is_empty()) {
            Some(folder) => format!("{}/{}", folder, key),
            None => key,
        }
    }

    /// Uploads a local file under a freshly derived key and returns the key.
    pub async fn upload_file_with_key(
        &self,
        file_path: &Path,
        file_name: &str,
        is_private: bool,
        parent_type: &str,
        parent_id: Option<&str>,
    ) -> Result<String, CdnError> {
        let content_type = guess_content_type(file_name);
        let key = self.generate_key(file_name, parent_type, parent_id);

        let mut metadata = BTreeMap::new();
        metadata.insert("ContentType".to_string(), content_type.clone());
        if is_private {
            metadata.insert("file_name".to_string(), file_name.to_string());
        }

        let options = UploadOptions {
            content_type,
            metadata,
            public_read: !is_private,
        };

        tracing::info!(
            "☁️  Uploading {} to {} (private: {})",
            file_path.display(),
            key,
            is_private
        );

        self.storage
            .upload_path(file_path, &key, options)
            .await
            .map_err(|source| {
                tracing::error!("❌ Upload of {} failed: {:#}", key, source);
                CdnError::UploadFailed {
                    key: key.clone(),
                    source,
                }
            })?;

        Ok(key)
    }

    /// No-op unless `delete_file_from_cloud` is set; only access denial is reported.
    pub async fn delete_from_cdn(&self, key: &str) -> Result<(), CdnError> {
        if !self.settings.delete_file_from_cloud {
            tracing::debug!("Cloud delete disabled, keeping {}", key);
            return Ok(());
        }

        match self.storage.delete_object(key).await {
            Ok(()) => {
                tracing::info!("🗑️  Deleted {} from bucket {}", key, self.settings.bucket_name);
                Ok(())
            }
            Err(e) if e.downcast_ref::<AccessDeniedError>().is_some() => {
                tracing::error!("❌ Access denied deleting {}", key);
                Err(CdnError::AccessDenied {
                    key: key.to_string(),
                })
            }
            Err(e) => {
                tracing::warn!("⚠️  Delete of {} failed: {:#}", key, e);
                Ok(())
            }
        }
    }

    pub async fn read_file_from_cdn(&self, key: &str) -> Result<Vec<u8>, CdnError> {
        Ok(self.storage.get_object(key).await?)
    }

    /// Time-limited GET URL; `file_name` becomes the response content-disposition.
    pub async fn get_url(&self, key: &str, file_name: Option<&str>) -> Result<String, CdnError> {
        let disposition = file_name
            .filter(|f| !f.is_empty())
            .map(|f| format!("filename={}", f));

        let url = self
            .storage
            .presigned_get_url(key, self.settings.signed_url_expiry(), disposition.as_deref())
            .await?;
        Ok(url)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.settings.endpoint_url(),
            self.settings.bucket_name,
            key
        )
    }
}
