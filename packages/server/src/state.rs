use std::sync::Arc;

use common::storage::BlobStore;

use crate::config::AppConfig;
use crate::metadata::MetadataStore;
use crate::references::ReferenceOracle;
use crate::service::{FileCache, FileError, FileService, GarbageCollector};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub files: Arc<FileService>,
    pub cache: Arc<FileCache>,
    pub gc: Arc<GarbageCollector>,
}

impl AppState {
    /// Wire the file services over the given stores.
    pub fn new(
        config: AppConfig,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        references: Arc<dyn ReferenceOracle>,
    ) -> Result<Self, FileError> {
        let files = Arc::new(FileService::new(
            Arc::clone(&blobs),
            Arc::clone(&metadata),
            &config.file.checksum_algorithm,
            config.file.checksum_encoding,
        )?);
        let cache = Arc::new(FileCache::new(
            Arc::clone(&files),
            &config.cache.metadata,
            &config.cache.data,
        ));
        let gc = Arc::new(
            GarbageCollector::new(blobs, metadata, references).with_cache(Arc::clone(&cache)),
        );

        Ok(Self {
            config: Arc::new(config),
            files,
            cache,
            gc,
        })
    }
}
