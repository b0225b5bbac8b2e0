use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Parent type used in keys when a file is not attached to any record.
pub const UNATTACHED_PARENT_TYPE: &str = "File";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub file_name: String,
    pub file_url: Option<String>,
    #[sea_orm(default_value = false)]
    pub is_private: bool,
    pub attached_to_doctype: Option<String>,
    pub attached_to_name: Option<String>,
    pub folder: Option<String>,
    pub old_parent: Option<String>,
    /// Holds the storage key once the file is offloaded.
    pub content_hash: Option<String>,
    pub created_at: Option<DateTimeUtc>,
    pub modified_at: Option<DateTimeUtc>,
}

impl Model {
    pub fn parent_type(&self) -> &str {
        self.attached_to_doctype
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(UNATTACHED_PARENT_TYPE)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
