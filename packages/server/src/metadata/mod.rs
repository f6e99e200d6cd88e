//! Durable per-file metadata, keyed by unique name.

mod memory;
mod sql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

pub use memory::MemoryMetadataStore;
pub use sql::SqlMetadataStore;

use crate::entity::file_metadata;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),

    #[error("metadata for {0} already exists")]
    Duplicate(String),

    #[error("metadata for {0} no longer exists")]
    Missing(String),
}

/// Descriptive and integrity data for one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct FileMetadata {
    #[schema(example = "0192e4a1-7c3e-4b7a-9f1d-2a6c8e0b5d43.jpg")]
    pub unique_name: String,
    #[schema(example = "avatar")]
    pub owner_type: String,
    #[schema(example = "portrait.JPG")]
    pub original_name: Option<String>,
    #[schema(example = "jpg")]
    pub extension: Option<String>,
    #[schema(example = "image/jpeg")]
    pub mime_type: Option<String>,
    /// Byte count, absent while the upload is pending.
    #[schema(example = 142857)]
    pub size: Option<i64>,
    /// Encoded digest, absent while the upload is pending.
    #[schema(example = "qvTGHdzF6KLavt4PO0gs2a6pQ00=")]
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FileMetadata {
    /// A row is pending between its insertion and the end of the blob write.
    pub fn is_pending(&self) -> bool {
        self.size.is_none() || self.checksum.is_none()
    }
}

impl From<file_metadata::Model> for FileMetadata {
    fn from(model: file_metadata::Model) -> Self {
        Self {
            unique_name: model.unique_name,
            owner_type: model.owner_type,
            original_name: model.original_name,
            extension: model.extension,
            mime_type: model.mime_type,
            size: model.size,
            checksum: model.checksum,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a new, usually pending, row.
    async fn insert(&self, record: FileMetadata) -> Result<(), MetadataError>;

    /// Record the final size and checksum once the blob is written.
    ///
    /// Fails with [`MetadataError::Missing`] if the row was deleted meanwhile.
    async fn finalize(
        &self,
        unique_name: &str,
        size: i64,
        checksum: &str,
    ) -> Result<(), MetadataError>;

    async fn get(&self, unique_name: &str) -> Result<Option<FileMetadata>, MetadataError>;

    /// Unique names of every row whose owner type is in `owner_types`.
    async fn list_by_owner_types(
        &self,
        owner_types: &[String],
    ) -> Result<Vec<String>, MetadataError>;

    /// Delete the named rows, skipping missing ones. Returns the rows removed.
    async fn delete_all(&self, unique_names: &[String]) -> Result<u64, MetadataError>;
}
