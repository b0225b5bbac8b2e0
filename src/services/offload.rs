use crate::api::error::AppError;
use crate::config::{ATTACHMENTS_FOLDER, CdnConfig, REDIRECT_PATH};
use crate::entities::{prelude::*, *};
use crate::services::cdn::CdnOperations;
use crate::services::key_generator::KeyGenerator;
use crate::services::settings::SettingsService;
use crate::services::storage::StorageConnector;
use crate::utils::validation::{validate_identifier, validate_local_file_url};
use chrono::Utc;
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, Set,
    TransactionTrait,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Result of handling a file-upload event.
#[derive(Debug, Clone, PartialEq)]
pub enum OffloadOutcome {
    Offloaded { key: String, file_url: String },
    Skipped { parent_type: String },
}

/// Whether a file URL already points at offloaded storage.
pub fn is_offloaded_url(file_url: &str) -> bool {
    file_url.starts_with("https:") || file_url.starts_with(REDIRECT_PATH)
}

/// Indirect URL for a private object, served by the redirect endpoint.
pub fn private_file_url(key: &str, file_name: &str) -> Result<String, AppError> {
    let query = serde_urlencoded::to_string([("key", key), ("file_name", file_name)])
        .map_err(|e| AppError::Internal(format!("Failed to encode file URL: {}", e)))?;
    Ok(format!("{}?{}", REDIRECT_PATH, query))
}

/// Event-driven glue between file records and the object store.
pub struct OffloadService {
    db: DatabaseConnection,
    connector: Arc<dyn StorageConnector>,
    key_generator: Option<Arc<dyn KeyGenerator>>,
    config: CdnConfig,
}

impl OffloadService {
    pub fn new(
        db: DatabaseConnection,
        connector: Arc<dyn StorageConnector>,
        key_generator: Option<Arc<dyn KeyGenerator>>,
        config: CdnConfig,
    ) -> Self {
        Self {
            db,
            connector,
            key_generator,
            config,
        }
    }

    /// Fresh manager built from the settings currently stored in the database.
    pub async fn operations(&self) -> Result<CdnOperations, AppError> {
        let settings = SettingsService::load(&self.db).await?;
        let storage = self.connector.connect(&settings);
        Ok(CdnOperations::new(
            storage,
            settings,
            self.key_generator.clone(),
        ))
    }

    /// Handles the upload event for the file record `name`.
    pub async fn file_upload_to_cdn(&self, name: &str) -> Result<OffloadOutcome, AppError> {
        let file = Files::find_by_id(name.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", name)))?;

        let parent_type = file.parent_type().to_string();
        if self
            .config
            .ignore_upload_for_doctype
            .iter()
            .any(|d| d == &parent_type)
        {
            tracing::info!("⏭️  Skipping CDN upload for {} (attached to {})", name, parent_type);
            return Ok(OffloadOutcome::Skipped { parent_type });
        }

        let ops = self.operations().await?;
        self.offload_record(&ops, file).await
    }

    /// Handles the delete event for a file whose storage key is `key`.
    pub async fn delete_from_cloud(&self, key: &str) -> Result<(), AppError> {
        if key.is_empty() {
            tracing::debug!("File has no storage key, nothing to delete");
            return Ok(());
        }
        let ops = self.operations().await?;
        ops.delete_from_cdn(key).await?;
        Ok(())
    }

    /// Storage key recorded for a file, if it was offloaded.
    pub async fn storage_key_for(&self, name: &str) -> Result<Option<String>, AppError> {
        let file = Files::find_by_id(name.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", name)))?;
        Ok(file.content_hash.filter(|k| !k.is_empty()))
    }

    pub async fn signed_url(&self, key: &str, file_name: Option<&str>) -> Result<String, AppError> {
        let ops = self.operations().await?;
        Ok(ops.get_url(key, file_name).await?)
    }

    /// Offloads every file record that still points at local storage.
    ///
    /// Records are processed one at a time; the first failure aborts the run.
    pub async fn migrate_existing_files(&self) -> Result<usize, AppError> {
        let files = Files::find()
            .order_by_asc(files::Column::Name)
            .all(&self.db)
            .await?;

        let ops = self.operations().await?;
        let mut migrated = 0;

        tracing::info!("🚚 Migrating existing files ({} records)", files.len());

        for file in files {
            let Some(file_url) = file.file_url.as_deref().filter(|u| !u.is_empty()) else {
                continue;
            };
            if is_offloaded_url(file_url) {
                continue;
            }

            let name = file.name.clone();
            if let Err(e) = self.offload_record(&ops, file).await {
                tracing::error!("❌ Migration stopped at {}: {}", name, e);
                return Err(e);
            }
            migrated += 1;
        }

        tracing::info!("✅ Migration finished, {} files moved to the CDN", migrated);
        Ok(migrated)
    }

    fn local_path(&self, file: &files::Model) -> Result<PathBuf, AppError> {
        let file_url = file
            .file_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::BadRequest(format!("File {} has no file_url", file.name)))?;

        validate_local_file_url(file_url).map_err(|e| AppError::BadRequest(e.to_string()))?;

        let site_path = self.config.site_path.display();
        let path = if file.is_private {
            format!("{}{}", site_path, file_url)
        } else {
            format!("{}/public{}", site_path, file_url)
        };
        Ok(PathBuf::from(path))
    }

    async fn offload_record(
        &self,
        ops: &CdnOperations,
        file: files::Model,
    ) -> Result<OffloadOutcome, AppError> {
        let parent_type = file.parent_type().to_string();
        let local_path = self.local_path(&file)?;

        let key = ops
            .upload_file_with_key(
                &local_path,
                &file.file_name,
                file.is_private,
                &parent_type,
                file.attached_to_name.as_deref(),
            )
            .await?;

        let file_url = if file.is_private {
            private_file_url(&key, &file.file_name)?
        } else {
            ops.public_url(&key)
        };

        if let Err(e) = tokio::fs::remove_file(&local_path).await {
            tracing::warn!(
                "⚠️  Uploaded {} but could not remove local copy {}: {}",
                key,
                local_path.display(),
                e
            );
        }

        let txn = self.db.begin().await?;

        let attached_to_name = file.attached_to_name.clone();
        let name = file.name.clone();
        let mut active: files::ActiveModel = file.into();
        active.file_url = Set(Some(file_url.clone()));
        active.folder = Set(Some(ATTACHMENTS_FOLDER.to_string()));
        active.old_parent = Set(Some(ATTACHMENTS_FOLDER.to_string()));
        active.content_hash = Set(Some(key.clone()));
        active.modified_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        if let Some(parent_name) = attached_to_name.as_deref().filter(|n| !n.is_empty()) {
            Self::mirror_image_field(&txn, &parent_type, parent_name, &file_url).await?;
        }

        txn.commit().await?;

        tracing::info!("✅ File {} offloaded as {}", name, key);
        Ok(OffloadOutcome::Offloaded { key, file_url })
    }

    /// Copies the new URL into the owning record's image field, when its type has one.
    async fn mirror_image_field<C: ConnectionTrait>(
        db: &C,
        parent_type: &str,
        parent_name: &str,
        file_url: &str,
    ) -> Result<(), AppError> {
        let Some(meta) = DoctypeMeta::find_by_id(parent_type.to_string()).one(db).await? else {
            return Ok(());
        };
        let Some(image_field) = meta.image_field.as_deref().filter(|f| !f.is_empty()) else {
            return Ok(());
        };

        validate_identifier(&meta.table_name).map_err(|e| AppError::Internal(e.to_string()))?;
        validate_identifier(image_field).map_err(|e| AppError::Internal(e.to_string()))?;

        let stmt = Query::update()
            .table(Alias::new(meta.table_name.as_str()))
            .value(Alias::new(image_field), file_url)
            .and_where(Expr::col(Alias::new("name")).eq(parent_name))
            .to_owned();

        let backend = db.get_database_backend();
        db.execute(backend.build(&stmt)).await?;

        tracing::debug!(
            "🖼️  Mirrored {} into {}.{} for {}",
            file_url,
            meta.table_name,
            image_field,
            parent_name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offloaded_url_detection() {
        assert!(is_offloaded_url("https://media.s3.fra1.amazonaws.com/media/k"));
        assert!(is_offloaded_url(
            "/api/method/cdn_attachment.generate_file?key=a&file_name=b"
        ));
        assert!(!is_offloaded_url("/files/logo.png"));
        assert!(!is_offloaded_url("/private/files/contract.pdf"));
        assert!(!is_offloaded_url("http://insecure.example.com/x.png"));
    }

    #[test]
    fn test_private_file_url_encodes_query() {
        let url = private_file_url("2024/01/02/File/ABCDEFGH_my_file.pdf", "my file.pdf").unwrap();
        assert_eq!(
            url,
            "/api/method/cdn_attachment.generate_file?key=2024%2F01%2F02%2FFile%2FABCDEFGH_my_file.pdf&file_name=my+file.pdf"
        );
        assert!(is_offloaded_url(&url));
    }
}
