use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::error::StorageError;
use super::name::validate_blob_name;
use super::traits::{BlobStore, BoxReader};

/// Filesystem-backed blob store.
///
/// Blobs are stored in a sharded directory layout:
/// `{base_path}/{first 2 chars of name}/{name}`
///
/// Writes land in `{base_path}/.tmp` first and are renamed into place once
/// complete, so a half-written blob is never visible under its name.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Compute the filesystem path for a given blob name.
    fn blob_path(&self, name: &str) -> PathBuf {
        let shard = name.get(..2).unwrap_or("_");
        self.base_path.join(shard).join(name)
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_temp(
        &self,
        reader: &mut BoxReader,
        temp_path: &Path,
    ) -> Result<u64, StorageError> {
        let mut temp_file = fs::File::create(temp_path).await?;
        let mut total_bytes: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        temp_file.sync_all().await?;
        Ok(total_bytes)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(&self, name: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        validate_blob_name(name)?;
        let temp_path = self.temp_path();

        let written = match self.write_temp(&mut reader, &temp_path).await {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };
        drop(reader);

        let blob_path = self.blob_path(name);
        if let Some(parent) = blob_path.parent()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(name, written, "Stored blob");
        Ok(written)
    }

    async fn get_stream(&self, name: &str) -> Result<Option<BoxReader>, StorageError> {
        validate_blob_name(name)?;
        match fs::File::open(self.blob_path(name)).await {
            Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        validate_blob_name(name)?;
        Ok(fs::try_exists(self.blob_path(name)).await?)
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        validate_blob_name(name)?;
        match fs::remove_file(self.blob_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
