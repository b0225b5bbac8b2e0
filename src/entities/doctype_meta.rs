use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "doctype_meta")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub doctype: String,
    pub table_name: String,
    /// Column that mirrors the URL of the record's latest attachment
    pub image_field: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
