#![allow(dead_code)]

use async_trait::async_trait;
use cdn_attachment::config::{CdnConfig, CdnSettings};
use cdn_attachment::entities::{doctype_meta, files};
use cdn_attachment::infrastructure::database;
use cdn_attachment::services::key_generator::KeyGenerator;
use cdn_attachment::services::offload::OffloadService;
use cdn_attachment::services::settings::SettingsService;
use cdn_attachment::services::storage::{
    AccessDeniedError, StorageConnector, StorageService, UploadOptions,
};
use cdn_attachment::{AppState, create_app};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set, Statement};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub key: String,
    pub bucket: String,
    pub data: Vec<u8>,
    pub options: UploadOptions,
}

/// In-memory object store shared by every client the connector hands out.
#[derive(Default)]
pub struct MockStorageService {
    pub objects: Mutex<HashMap<String, RecordedUpload>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub deletes: Mutex<Vec<String>>,
    pub fail_uploads: AtomicBool,
    pub deny_deletes: AtomicBool,
    bucket: Mutex<String>,
}

impl MockStorageService {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn last_upload(&self) -> RecordedUpload {
        self.uploads
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no upload recorded")
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn upload_path(&self, path: &Path, key: &str, options: UploadOptions) -> anyhow::Result<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("S3UploadFailedError"));
        }
        let data = tokio::fs::read(path).await?;
        let upload = RecordedUpload {
            key: key.to_string(),
            bucket: self.bucket.lock().unwrap().clone(),
            data,
            options,
        };
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), upload.clone());
        self.uploads.lock().unwrap().push(upload);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        if self.deny_deletes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!(AccessDeniedError {
                key: key.to_string()
            }));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| anyhow::anyhow!("NoSuchKey"))
    }

    async fn file_exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
        content_disposition: Option<&str>,
    ) -> anyhow::Result<String> {
        let mut url = url::Url::parse("https://signed.mock.test/")?;
        url.set_path(&format!("{}/{}", self.bucket.lock().unwrap(), key));
        url.query_pairs_mut()
            .append_pair("X-Amz-Expires", &expires_in.as_secs().to_string());
        if let Some(disposition) = content_disposition {
            url.query_pairs_mut()
                .append_pair("response-content-disposition", disposition);
        }
        Ok(url.to_string())
    }
}

pub struct MockConnector {
    pub storage: Arc<MockStorageService>,
    pub connections: Mutex<Vec<CdnSettings>>,
}

impl StorageConnector for MockConnector {
    fn connect(&self, settings: &CdnSettings) -> Arc<dyn StorageService> {
        *self.storage.bucket.lock().unwrap() = settings.bucket_name.clone();
        self.connections.lock().unwrap().push(settings.clone());
        self.storage.clone()
    }
}

pub struct TestContext {
    pub db: DatabaseConnection,
    pub storage: Arc<MockStorageService>,
    pub connector: Arc<MockConnector>,
    pub offload: Arc<OffloadService>,
    pub config: CdnConfig,
    pub site: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_key_generator(None).await
    }

    pub async fn with_key_generator(key_generator: Option<Arc<dyn KeyGenerator>>) -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        database::run_migrations(&db).await.unwrap();

        let site = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(site.path().join("public/files")).unwrap();
        std::fs::create_dir_all(site.path().join("private/files")).unwrap();

        let mut config = CdnConfig::development();
        config.site_path = site.path().to_path_buf();
        config.settings = test_settings();
        SettingsService::seed(&db, &config.settings).await.unwrap();

        let storage = Arc::new(MockStorageService::default());
        let connector = Arc::new(MockConnector {
            storage: storage.clone(),
            connections: Mutex::new(Vec::new()),
        });

        let offload = Arc::new(OffloadService::new(
            db.clone(),
            connector.clone(),
            key_generator,
            config.clone(),
        ));

        Self {
            db,
            storage,
            connector,
            offload,
            config,
            site,
        }
    }

    pub fn app(&self) -> axum::Router {
        create_app(AppState {
            db: self.db.clone(),
            connector: self.connector.clone(),
            offload: self.offload.clone(),
            config: self.config.clone(),
        })
    }

    /// Writes a file under the site directory and inserts its record.
    pub async fn add_file(
        &self,
        name: &str,
        file_name: &str,
        is_private: bool,
        attached_to: Option<(&str, &str)>,
    ) -> PathBuf {
        let file_url = if is_private {
            format!("/private/files/{}", file_name)
        } else {
            format!("/files/{}", file_name)
        };
        let path = self.local_path(&file_url, is_private);
        std::fs::write(&path, format!("contents of {}", file_name)).unwrap();

        self.insert_record(name, file_name, Some(file_url), is_private, attached_to)
            .await;
        path
    }

    pub async fn insert_record(
        &self,
        name: &str,
        file_name: &str,
        file_url: Option<String>,
        is_private: bool,
        attached_to: Option<(&str, &str)>,
    ) {
        files::ActiveModel {
            name: Set(name.to_string()),
            file_name: Set(file_name.to_string()),
            file_url: Set(file_url),
            is_private: Set(is_private),
            attached_to_doctype: Set(attached_to.map(|(d, _)| d.to_string())),
            attached_to_name: Set(attached_to.map(|(_, n)| n.to_string())),
            folder: Set(Some("Home".to_string())),
            old_parent: Set(None),
            content_hash: Set(None),
            created_at: Set(Some(Utc::now())),
            modified_at: Set(None),
        }
        .insert(&self.db)
        .await
        .unwrap();
    }

    pub fn local_path(&self, file_url: &str, is_private: bool) -> PathBuf {
        let relative = file_url.trim_start_matches('/');
        if is_private {
            self.site.path().join(relative)
        } else {
            self.site.path().join("public").join(relative)
        }
    }

    /// Creates an owning table whose `image` column mirrors attachment URLs.
    pub async fn add_doctype_with_image(&self, doctype: &str, table_name: &str, record: &str) {
        let backend = self.db.get_database_backend();
        self.db
            .execute(Statement::from_string(
                backend,
                format!(
                    "CREATE TABLE \"{}\" (name TEXT PRIMARY KEY, image TEXT)",
                    table_name
                ),
            ))
            .await
            .unwrap();
        self.db
            .execute(Statement::from_string(
                backend,
                format!("INSERT INTO \"{}\" (name) VALUES ('{}')", table_name, record),
            ))
            .await
            .unwrap();

        doctype_meta::ActiveModel {
            doctype: Set(doctype.to_string()),
            table_name: Set(table_name.to_string()),
            image_field: Set(Some("image".to_string())),
        }
        .insert(&self.db)
        .await
        .unwrap();
    }

    pub async fn image_of(&self, table_name: &str, record: &str) -> Option<String> {
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(Statement::from_string(
                backend,
                format!("SELECT image FROM \"{}\" WHERE name = '{}'", table_name, record),
            ))
            .await
            .unwrap()
            .expect("owning record missing");
        row.try_get::<Option<String>>("", "image").unwrap()
    }
}

pub fn test_settings() -> CdnSettings {
    CdnSettings {
        bucket_name: "attachments".to_string(),
        region_name: "fra1".to_string(),
        cdn_url: Some("digitaloceanspaces.com".to_string()),
        cdn_key: Some("key".to_string()),
        cdn_secret: Some("secret".to_string()),
        folder_name: None,
        signed_url_expiry_time: Some(300),
        delete_file_from_cloud: true,
    }
}
