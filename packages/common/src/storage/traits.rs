use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Blob storage keyed by an opaque unique name.
///
/// The reader handed to [`BlobStore::put_stream`] is owned by the store and
/// dropped on every exit path, which closes the underlying source.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `name` and return the number of bytes written.
    async fn put(&self, name: &str, data: &[u8]) -> Result<u64, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(name, reader).await
    }

    /// Store data from an async reader under `name`.
    ///
    /// A blob only becomes visible to readers once the whole stream was written.
    async fn put_stream(&self, name: &str, reader: BoxReader) -> Result<u64, StorageError>;

    /// Retrieve all bytes stored under `name`.
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(mut reader) = self.get_stream(name).await? else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(Some(buf))
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, name: &str) -> Result<Option<BoxReader>, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;

    /// Delete every named blob, skipping the ones that do not exist.
    ///
    /// Stops at the first failure; names before it stay deleted, so the call
    /// can simply be repeated.
    async fn delete_all(&self, names: &[String]) -> Result<u64, StorageError> {
        let mut deleted = 0;
        for name in names {
            if self.delete(name).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
