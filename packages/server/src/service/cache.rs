use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use moka::future::{Cache, CacheBuilder};
use serde::Deserialize;
use tracing::debug;

use super::{FileError, FileService};
use crate::metadata::FileMetadata;

/// Sizing and expiry of one [`LoadingCache`].
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Entry count, or total weight for weighted caches.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Zero keeps entries until they are evicted or invalidated.
    #[serde(default = "default_time_to_live_secs")]
    pub time_to_live_secs: u64,
    /// Remember that a key has no value instead of asking the loader again.
    #[serde(default = "default_cache_absent")]
    pub cache_absent: bool,
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_time_to_live_secs() -> u64 {
    3600
}

fn default_cache_absent() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            time_to_live_secs: default_time_to_live_secs(),
            cache_absent: default_cache_absent(),
        }
    }
}

type Loader<V> = Arc<dyn Fn(String) -> BoxFuture<'static, Result<Option<V>, FileError>> + Send + Sync>;
type Retain<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Outcomes of a load that must not be stored.
enum Miss<V> {
    Absent,
    Transient(V),
    Failed(FileError),
}

/// Key/value cache that populates itself from a loader.
///
/// Concurrent lookups of the same missing key share a single loader call.
/// Loader failures are handed to every waiter but never cached.
pub struct LoadingCache<V> {
    inner: Cache<String, Option<V>>,
    loader: Loader<V>,
    retain: Option<Retain<V>>,
    cache_absent: bool,
}

impl<V> LoadingCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(settings: &CacheSettings, loader: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<V>, FileError>> + Send + 'static,
    {
        Self::build(Cache::builder(), settings, loader)
    }

    /// Like [`LoadingCache::new`], with capacity measured by `weigher`.
    ///
    /// Absent markers weigh one.
    pub fn weighted<F, Fut, W>(settings: &CacheSettings, weigher: W, loader: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<V>, FileError>> + Send + 'static,
        W: Fn(&V) -> u32 + Send + Sync + 'static,
    {
        let builder = Cache::builder()
            .weigher(move |_key: &String, value: &Option<V>| value.as_ref().map_or(1, &weigher));
        Self::build(builder, settings, loader)
    }

    fn build<F, Fut>(
        builder: CacheBuilder<String, Option<V>, Cache<String, Option<V>>>,
        settings: &CacheSettings,
        loader: F,
    ) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<V>, FileError>> + Send + 'static,
    {
        let mut builder = builder.max_capacity(settings.max_capacity);
        if settings.time_to_live_secs > 0 {
            builder = builder.time_to_live(Duration::from_secs(settings.time_to_live_secs));
        }
        Self {
            inner: builder.build(),
            loader: Arc::new(move |key| loader(key).boxed()),
            retain: None,
            cache_absent: settings.cache_absent,
        }
    }

    /// Only keep loaded values for which `predicate` holds; others are
    /// returned to the caller and loaded again next time.
    pub fn retain_if(mut self, predicate: impl Fn(&V) -> bool + Send + Sync + 'static) -> Self {
        self.retain = Some(Arc::new(predicate));
        self
    }

    /// Cached value for `key`, loading it on a miss.
    pub async fn get(&self, key: &str) -> Result<Option<V>, FileError> {
        let loader = Arc::clone(&self.loader);
        let retain = self.retain.clone();
        let cache_absent = self.cache_absent;
        let owned = key.to_string();

        let init = async move {
            match loader(owned).await {
                Ok(Some(value)) => match retain {
                    Some(keep) if !keep(&value) => Err(Miss::Transient(value)),
                    _ => Ok(Some(value)),
                },
                Ok(None) if cache_absent => Ok(None),
                Ok(None) => Err(Miss::Absent),
                Err(e) => Err(Miss::Failed(e)),
            }
        };

        match self.inner.try_get_with(key.to_string(), init).await {
            Ok(value) => Ok(value),
            Err(miss) => match miss.as_ref() {
                Miss::Absent => Ok(None),
                Miss::Transient(value) => Ok(Some(value.clone())),
                Miss::Failed(e) => {
                    debug!(key, error = %e, "Cache load failed");
                    Err(FileError::Load(e.to_string()))
                }
            },
        }
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Approximate number of stored entries, absent markers included.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

/// A completed file served from cache.
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub metadata: FileMetadata,
    pub data: Bytes,
}

/// Read-through caches in front of a [`FileService`].
///
/// Pending metadata rows are never stored, so a file becomes visible as soon
/// as its upload completes.
pub struct FileCache {
    metadata: LoadingCache<FileMetadata>,
    data: LoadingCache<Bytes>,
}

impl FileCache {
    pub fn new(
        files: Arc<FileService>,
        metadata_settings: &CacheSettings,
        data_settings: &CacheSettings,
    ) -> Self {
        let service = Arc::clone(&files);
        let metadata = LoadingCache::new(metadata_settings, move |name: String| {
            let service = Arc::clone(&service);
            async move { service.fetch_metadata(&name).await }
        })
        .retain_if(|meta: &FileMetadata| !meta.is_pending());

        let data = LoadingCache::weighted(
            data_settings,
            |bytes: &Bytes| u32::try_from(bytes.len()).unwrap_or(u32::MAX),
            move |name: String| {
                let files = Arc::clone(&files);
                async move { files.fetch_data(&name).await }
            },
        );

        Self { metadata, data }
    }

    pub async fn fetch_metadata(
        &self,
        unique_name: &str,
    ) -> Result<Option<FileMetadata>, FileError> {
        self.metadata.get(unique_name).await
    }

    pub async fn fetch_data(&self, unique_name: &str) -> Result<Option<Bytes>, FileError> {
        self.data.get(unique_name).await
    }

    /// Metadata and contents of a completed file.
    pub async fn fetch(&self, unique_name: &str) -> Result<Option<CachedFile>, FileError> {
        let Some(metadata) = self.fetch_metadata(unique_name).await? else {
            return Ok(None);
        };
        if metadata.is_pending() {
            return Ok(None);
        }
        let Some(data) = self.fetch_data(unique_name).await? else {
            return Ok(None);
        };
        Ok(Some(CachedFile { metadata, data }))
    }

    /// Drop both cache entries for `unique_name`.
    pub async fn invalidate(&self, unique_name: &str) {
        self.metadata.invalidate(unique_name).await;
        self.data.invalidate(unique_name).await;
    }
}
