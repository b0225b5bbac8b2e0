use crate::api::error::AppError;
use crate::config::{CdnSettings, SETTINGS_NAME};
use crate::entities::cdn_settings;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel, Set, TryIntoModel,
};
use serde::Deserialize;
use utoipa::ToSchema;

/// Partial update of the settings row; absent fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub bucket_name: Option<String>,
    pub region_name: Option<String>,
    pub cdn_url: Option<String>,
    pub cdn_key: Option<String>,
    pub cdn_secret: Option<String>,
    pub folder_name: Option<String>,
    pub signed_url_expiry_time: Option<u64>,
    pub delete_file_from_cloud: Option<bool>,
}

fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub struct SettingsService;

impl SettingsService {
    /// Current settings snapshot. Read on every call so operator changes apply immediately.
    pub async fn load<C: ConnectionTrait>(db: &C) -> Result<CdnSettings, AppError> {
        let row = cdn_settings::Entity::find_by_id(SETTINGS_NAME.to_string())
            .one(db)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("'{}' settings are not configured", SETTINGS_NAME))
            })?;
        Ok(row.into())
    }

    /// Writes the settings row if it does not exist yet. Returns true when a row was created.
    pub async fn seed<C: ConnectionTrait>(db: &C, settings: &CdnSettings) -> Result<bool, DbErr> {
        if cdn_settings::Entity::find_by_id(SETTINGS_NAME.to_string())
            .one(db)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        cdn_settings::ActiveModel {
            id: Set(SETTINGS_NAME.to_string()),
            bucket_name: Set(settings.bucket_name.clone()),
            region_name: Set(settings.region_name.clone()),
            cdn_url: Set(settings.cdn_url.clone()),
            cdn_key: Set(settings.cdn_key.clone()),
            cdn_secret: Set(settings.cdn_secret.clone()),
            folder_name: Set(settings.folder_name.clone()),
            signed_url_expiry_time: Set(settings
                .signed_url_expiry_time
                .and_then(|s| i64::try_from(s).ok())),
            delete_file_from_cloud: Set(settings.delete_file_from_cloud),
            updated_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        Ok(true)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        req: UpdateSettingsRequest,
    ) -> Result<CdnSettings, AppError> {
        let row = cdn_settings::Entity::find_by_id(SETTINGS_NAME.to_string())
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Settings not found".to_string()))?;

        let mut active = row.into_active_model();
        if let Some(bucket_name) = req.bucket_name {
            if bucket_name.trim().is_empty() {
                return Err(AppError::BadRequest("bucket_name cannot be empty".to_string()));
            }
            active.bucket_name = Set(bucket_name.trim().to_string());
        }
        if let Some(region_name) = req.region_name {
            active.region_name = Set(region_name.trim().to_string());
        }
        if let Some(cdn_url) = req.cdn_url {
            active.cdn_url = Set(blank_to_none(cdn_url));
        }
        if let Some(cdn_key) = req.cdn_key {
            active.cdn_key = Set(blank_to_none(cdn_key));
        }
        if let Some(cdn_secret) = req.cdn_secret {
            active.cdn_secret = Set(blank_to_none(cdn_secret));
        }
        if let Some(folder_name) = req.folder_name {
            active.folder_name = Set(blank_to_none(folder_name.trim_matches('/').to_string()));
        }
        if let Some(expiry) = req.signed_url_expiry_time {
            let expiry = i64::try_from(expiry)
                .map_err(|_| AppError::BadRequest("signed_url_expiry_time is too large".to_string()))?;
            active.signed_url_expiry_time = Set(Some(expiry));
        }
        if let Some(flag) = req.delete_file_from_cloud {
            active.delete_file_from_cloud = Set(flag);
        }
        active.updated_at = Set(Utc::now());

        // The endpoint is built from bucket, region and CDN host, so the combination must form a URL
        let candidate: cdn_settings::Model = active.clone().try_into_model()?;
        let candidate: CdnSettings = candidate.into();
        url::Url::parse(&candidate.endpoint_url())
            .map_err(|e| AppError::BadRequest(format!("Invalid endpoint settings: {}", e)))?;

        let updated: CdnSettings = active.update(db).await?.into();

        tracing::info!(
            "🛠️  Settings updated: bucket={}, region={}, delete_from_cloud={}",
            updated.bucket_name,
            updated.region_name,
            updated.delete_file_from_cloud
        );

        Ok(updated)
    }
}
