use std::io::Cursor;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::AsyncReadExt;

use super::error::StorageError;
use super::name::validate_blob_name;
use super::traits::{BlobStore, BoxReader};

/// In-process blob store. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
    max_size: Option<u64>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(max_size: u64) -> Self {
        Self {
            blobs: DashMap::new(),
            max_size: Some(max_size),
        }
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_stream(&self, name: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        validate_blob_name(name)?;

        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;

        let size = data.len() as u64;
        if let Some(limit) = self.max_size
            && size > limit
        {
            return Err(StorageError::SizeLimitExceeded {
                actual: size,
                limit,
            });
        }

        self.blobs.insert(name.to_string(), data);
        Ok(size)
    }

    async fn get_stream(&self, name: &str) -> Result<Option<BoxReader>, StorageError> {
        Ok(self.blobs.get(name).map(|data| {
            let reader: BoxReader = Box::new(Cursor::new(data.value().clone()));
            reader
        }))
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.remove(name).is_some())
    }
}
