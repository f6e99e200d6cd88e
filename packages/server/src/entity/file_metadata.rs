use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_metadata")]
pub struct Model {
    /// Random storage name, also the blob key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub unique_name: String,

    /// Caller-defined classification (e.g. "avatar", "attachment").
    pub owner_type: String,

    pub original_name: Option<String>,
    pub extension: Option<String>,
    pub mime_type: Option<String>,

    /// Null until the blob write completes.
    pub size: Option<i64>,

    /// Null until the blob write completes.
    pub checksum: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
