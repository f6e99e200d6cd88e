use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{FileMetadata, MetadataError, MetadataStore};

/// In-process metadata store for tests and single-node setups without a database.
#[derive(Default)]
pub struct MemoryMetadataStore {
    rows: DashMap<String, FileMetadata>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: FileMetadata) -> Result<(), MetadataError> {
        match self.rows.entry(record.unique_name.clone()) {
            Entry::Occupied(_) => Err(MetadataError::Duplicate(record.unique_name)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn finalize(
        &self,
        unique_name: &str,
        size: i64,
        checksum: &str,
    ) -> Result<(), MetadataError> {
        let mut row = self
            .rows
            .get_mut(unique_name)
            .ok_or_else(|| MetadataError::Missing(unique_name.to_string()))?;
        row.size = Some(size);
        row.checksum = Some(checksum.to_string());
        Ok(())
    }

    async fn get(&self, unique_name: &str) -> Result<Option<FileMetadata>, MetadataError> {
        Ok(self.rows.get(unique_name).map(|row| row.value().clone()))
    }

    async fn list_by_owner_types(
        &self,
        owner_types: &[String],
    ) -> Result<Vec<String>, MetadataError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| owner_types.contains(&row.owner_type))
            .map(|row| row.key().clone())
            .collect())
    }

    async fn delete_all(&self, unique_names: &[String]) -> Result<u64, MetadataError> {
        Ok(unique_names
            .iter()
            .filter(|name| self.rows.remove(name.as_str()).is_some())
            .count() as u64)
    }
}
