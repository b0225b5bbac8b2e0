use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cdn_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub bucket_name: String,
    pub region_name: String,
    pub cdn_url: Option<String>,
    pub cdn_key: Option<String>,
    pub cdn_secret: Option<String>,
    pub folder_name: Option<String>,
    pub signed_url_expiry_time: Option<i64>,
    #[sea_orm(default_value = false)]
    pub delete_file_from_cloud: bool,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::config::CdnSettings {
    fn from(model: Model) -> Self {
        Self {
            bucket_name: model.bucket_name,
            region_name: model.region_name,
            cdn_url: model.cdn_url,
            cdn_key: model.cdn_key,
            cdn_secret: model.cdn_secret,
            folder_name: model.folder_name,
            signed_url_expiry_time: model
                .signed_url_expiry_time
                .and_then(|s| u64::try_from(s).ok()),
            delete_file_from_cloud: model.delete_file_from_cloud,
        }
    }
}
