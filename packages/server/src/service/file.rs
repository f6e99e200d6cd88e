use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use common::storage::{
    BlobStore, BoxReader, ChecksumAlgorithm, ChecksumEncoding, ChecksumError, ChecksumReader,
    validate_blob_name,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::FileError;
use crate::metadata::{FileMetadata, MetadataError, MetadataStore};
use crate::utils::filename::{clean_extension, extension_from_filename, guess_mime_type};

/// Descriptive fields supplied by the uploader of a new file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFile {
    pub owner_type: String,
    pub original_name: Option<String>,
    /// Stored as given; only the unique name suffix uses the cleaned form.
    pub extension: Option<String>,
    pub mime_type: Option<String>,
}

impl NewFile {
    pub fn new(owner_type: impl Into<String>) -> Self {
        Self {
            owner_type: owner_type.into(),
            ..Default::default()
        }
    }

    /// Derives extension and MIME type from the uploaded file's name.
    pub fn named(owner_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let extension = extension_from_filename(&file_name).map(str::to_string);
        let mime_type = guess_mime_type(&file_name);
        Self {
            owner_type: owner_type.into(),
            original_name: Some(file_name),
            extension,
            mime_type,
        }
    }

    pub fn with_original_name(mut self, original_name: impl Into<String>) -> Self {
        self.original_name = Some(original_name.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Ingestion and uncached retrieval of stored files.
///
/// A file is written in two phases: a pending metadata row first, then the
/// blob, then the row is completed with size and checksum. A failure between
/// the phases leaves a pending row that the garbage collector reclaims.
pub struct FileService {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    algorithm: ChecksumAlgorithm,
    encoding: ChecksumEncoding,
}

impl FileService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        checksum_algorithm: &str,
        encoding: ChecksumEncoding,
    ) -> Result<Self, FileError> {
        let algorithm = checksum_algorithm
            .parse()
            .map_err(|e: ChecksumError| FileError::Config(e.to_string()))?;
        Ok(Self {
            blobs,
            metadata,
            algorithm,
            encoding,
        })
    }

    /// Store a new file and return its unique name.
    ///
    /// The reader is consumed and dropped on every path.
    #[instrument(skip(self, file, reader), fields(owner_type = %file.owner_type))]
    pub async fn add(&self, file: NewFile, reader: BoxReader) -> Result<String, FileError> {
        let suffix = file.extension.as_deref().and_then(clean_extension);
        let unique_name = generate_unique_name(suffix.as_deref());

        self.metadata
            .insert(FileMetadata {
                unique_name: unique_name.clone(),
                owner_type: file.owner_type,
                original_name: file.original_name,
                extension: file.extension,
                mime_type: file.mime_type,
                size: None,
                checksum: None,
                created_at: Utc::now(),
            })
            .await?;

        let (reader, handle) = ChecksumReader::new(reader, self.algorithm);
        if let Err(e) = self.blobs.put_stream(&unique_name, Box::new(reader)).await {
            warn!(unique_name, error = %e, "Blob write failed, metadata left pending");
            return Err(e.into());
        }

        let checksum = handle.finish()?;
        let size = i64::try_from(checksum.size).unwrap_or(i64::MAX);
        let encoded = checksum.encode(self.encoding);

        match self.metadata.finalize(&unique_name, size, &encoded).await {
            Ok(()) => {}
            Err(MetadataError::Missing(name)) => {
                // Row swept while the blob was being written.
                if let Err(e) = self.blobs.delete(&name).await {
                    warn!(unique_name = %name, error = %e, "Failed to remove orphaned blob");
                }
                return Err(MetadataError::Missing(name).into());
            }
            Err(e) => return Err(e.into()),
        }

        info!(unique_name, size, "Stored file");
        Ok(unique_name)
    }

    /// Metadata row for `unique_name`, pending or complete.
    pub async fn fetch_metadata(
        &self,
        unique_name: &str,
    ) -> Result<Option<FileMetadata>, FileError> {
        if validate_blob_name(unique_name).is_err() {
            return Ok(None);
        }
        Ok(self.metadata.get(unique_name).await?)
    }

    /// Whole blob contents.
    pub async fn fetch_data(&self, unique_name: &str) -> Result<Option<Bytes>, FileError> {
        if validate_blob_name(unique_name).is_err() {
            return Ok(None);
        }
        Ok(self.blobs.get(unique_name).await?.map(Bytes::from))
    }

    /// Blob contents as a stream, for files too large to buffer.
    pub async fn fetch_stream(&self, unique_name: &str) -> Result<Option<BoxReader>, FileError> {
        if validate_blob_name(unique_name).is_err() {
            return Ok(None);
        }
        Ok(self.blobs.get_stream(unique_name).await?)
    }
}

fn generate_unique_name(extension: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match extension {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}
