use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A live reference from a domain entity to a stored file.
///
/// Rows are written by the owning applications; the garbage collector only
/// reads them.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_ref")]
pub struct Model {
    /// UUID primary key, generated by the owning application.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owner entity type (e.g. "user", "message").
    pub owner_type: String,

    /// Owner entity ID (canonical string form).
    pub owner_id: String,

    pub unique_name: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
