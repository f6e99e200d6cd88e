use std::io::Cursor;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::error::StorageError;
use super::name::validate_blob_name;
use super::traits::{BlobStore, BoxReader};
use crate::config::ObjectStoreConfig;

/// Blob store backed by an S3-compatible bucket.
///
/// Objects are keyed by blob name at the bucket root. Path-style addressing
/// is used so MinIO and similar servers work without DNS setup.
pub struct ObjectBlobStore {
    bucket: Box<Bucket>,
    max_size: u64,
}

fn backend(err: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

impl ObjectBlobStore {
    pub fn new(config: &ObjectStoreConfig, max_size: u64) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(backend)?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(backend)?
            .with_path_style();

        Ok(Self { bucket, max_size })
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn put_stream(&self, name: &str, reader: BoxReader) -> Result<u64, StorageError> {
        validate_blob_name(name)?;

        // One byte past the limit is enough to detect an oversized upload.
        let mut limited = reader.take(self.max_size + 1);
        let response = self
            .bucket
            .put_object_stream(&mut limited, name)
            .await
            .map_err(backend)?;

        if !is_success(response.status_code()) {
            return Err(StorageError::Backend(format!(
                "upload of {name} returned status {}",
                response.status_code()
            )));
        }

        let written = self.max_size + 1 - limited.limit();
        if written > self.max_size {
            let _ = self.bucket.delete_object(name).await;
            return Err(StorageError::SizeLimitExceeded {
                actual: written,
                limit: self.max_size,
            });
        }

        debug!(name, written, "Stored object");
        Ok(written)
    }

    async fn get_stream(&self, name: &str) -> Result<Option<BoxReader>, StorageError> {
        validate_blob_name(name)?;
        let response = self.bucket.get_object(name).await.map_err(backend)?;
        match response.status_code() {
            404 => Ok(None),
            status if is_success(status) => {
                let reader: BoxReader = Box::new(Cursor::new(response.bytes().to_vec()));
                Ok(Some(reader))
            }
            status => Err(StorageError::Backend(format!(
                "download of {name} returned status {status}"
            ))),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        validate_blob_name(name)?;
        let (_, status) = self.bucket.head_object(name).await.map_err(backend)?;
        match status {
            404 => Ok(false),
            status if is_success(status) => Ok(true),
            status => Err(StorageError::Backend(format!(
                "head of {name} returned status {status}"
            ))),
        }
    }

    /// S3 deletes succeed whether or not the key existed, so this reports
    /// `true` for every accepted request.
    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        validate_blob_name(name)?;
        let response = self.bucket.delete_object(name).await.map_err(backend)?;
        match response.status_code() {
            404 => Ok(false),
            status if is_success(status) => Ok(true),
            status => Err(StorageError::Backend(format!(
                "delete of {name} returned status {status}"
            ))),
        }
    }
}
