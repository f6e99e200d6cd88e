use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::storage::memory::MemoryBlobStore;
use common::storage::{BlobStore, BoxReader, StorageError};

use super::{FileService, GarbageCollector};
use crate::metadata::MemoryMetadataStore;
use crate::references::MemoryReferences;

/// Memory blob store whose deletes can be made to fail. Counts reads.
#[derive(Default)]
pub(crate) struct FlakyBlobStore {
    pub inner: MemoryBlobStore,
    refused: Mutex<HashSet<String>>,
    reads: AtomicUsize,
}

impl FlakyBlobStore {
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn refuse_delete_of(&self, name: &str) {
        self.refused.lock().unwrap().insert(name.to_string());
    }

    pub fn heal(&self) {
        self.refused.lock().unwrap().clear();
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put_stream(&self, name: &str, reader: BoxReader) -> Result<u64, StorageError> {
        self.inner.put_stream(name, reader).await
    }

    async fn get_stream(&self, name: &str) -> Result<Option<BoxReader>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.inner.get_stream(name).await
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        self.inner.exists(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        if self.refused.lock().unwrap().contains(name) {
            return Err(StorageError::Backend(format!("delete of {name} refused")));
        }
        self.inner.delete(name).await
    }
}

/// A file service and collector sharing in-memory stores.
pub(crate) struct Harness {
    pub blobs: Arc<FlakyBlobStore>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub references: Arc<MemoryReferences>,
    pub files: Arc<FileService>,
    pub gc: GarbageCollector,
}

impl Harness {
    pub fn new() -> Self {
        let blobs = Arc::new(FlakyBlobStore::default());
        let metadata = Arc::new(MemoryMetadataStore::new());
        let references = Arc::new(MemoryReferences::new());
        let files = Arc::new(
            FileService::new(
                blobs.clone(),
                metadata.clone(),
                "SHA-1",
                Default::default(),
            )
            .unwrap(),
        );
        let gc = GarbageCollector::new(blobs.clone(), metadata.clone(), references.clone());
        Self {
            blobs,
            metadata,
            references,
            files,
            gc,
        }
    }
}

pub(crate) fn reader(data: &[u8]) -> BoxReader {
    Box::new(std::io::Cursor::new(data.to_vec()))
}
