use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set, SqlErr,
};
use tracing::instrument;

use super::{FileMetadata, MetadataError, MetadataStore};
use crate::entity::file_metadata;

/// Keeps `IN (...)` lists well under the bind parameter limit.
const CHUNK_SIZE: usize = 500;

/// Metadata store backed by the `file_metadata` table.
#[derive(Clone)]
pub struct SqlMetadataStore {
    db: DatabaseConnection,
}

impl SqlMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SqlMetadataStore {
    #[instrument(skip(self, record), fields(unique_name = %record.unique_name))]
    async fn insert(&self, record: FileMetadata) -> Result<(), MetadataError> {
        let unique_name = record.unique_name.clone();
        let model = file_metadata::ActiveModel {
            unique_name: Set(record.unique_name),
            owner_type: Set(record.owner_type),
            original_name: Set(record.original_name),
            extension: Set(record.extension),
            mime_type: Set(record.mime_type),
            size: Set(record.size),
            checksum: Set(record.checksum),
            created_at: Set(record.created_at),
        };

        match file_metadata::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(MetadataError::Duplicate(unique_name))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, checksum))]
    async fn finalize(
        &self,
        unique_name: &str,
        size: i64,
        checksum: &str,
    ) -> Result<(), MetadataError> {
        let patch = file_metadata::ActiveModel {
            size: Set(Some(size)),
            checksum: Set(Some(checksum.to_string())),
            ..Default::default()
        };

        let result = file_metadata::Entity::update_many()
            .set(patch)
            .filter(file_metadata::Column::UniqueName.eq(unique_name))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(MetadataError::Missing(unique_name.to_string()));
        }
        Ok(())
    }

    async fn get(&self, unique_name: &str) -> Result<Option<FileMetadata>, MetadataError> {
        Ok(file_metadata::Entity::find_by_id(unique_name.to_string())
            .one(&self.db)
            .await?
            .map(FileMetadata::from))
    }

    async fn list_by_owner_types(
        &self,
        owner_types: &[String],
    ) -> Result<Vec<String>, MetadataError> {
        if owner_types.is_empty() {
            return Ok(Vec::new());
        }

        Ok(file_metadata::Entity::find()
            .select_only()
            .column(file_metadata::Column::UniqueName)
            .filter(file_metadata::Column::OwnerType.is_in(owner_types.to_vec()))
            .into_tuple::<String>()
            .all(&self.db)
            .await?)
    }

    #[instrument(skip(self, unique_names), fields(count = unique_names.len()))]
    async fn delete_all(&self, unique_names: &[String]) -> Result<u64, MetadataError> {
        let mut deleted = 0;
        for chunk in unique_names.chunks(CHUNK_SIZE) {
            let result = file_metadata::Entity::delete_many()
                .filter(file_metadata::Column::UniqueName.is_in(chunk.to_vec()))
                .exec(&self.db)
                .await?;
            deleted += result.rows_affected;
        }
        Ok(deleted)
    }
}
