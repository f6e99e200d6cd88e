use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::storage::BlobStore;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use super::{FileCache, FileError};
use crate::config::GcConfig;
use crate::metadata::MetadataStore;
use crate::references::ReferenceOracle;

/// A blob that could not be deleted; its metadata is kept for the next sweep.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GcFailure {
    pub unique_name: String,
    pub error: String,
}

/// Outcome of one garbage collection sweep.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct GcReport {
    /// Files of the requested owner types.
    pub scanned: usize,
    /// Files still referenced by an owner.
    pub referenced: usize,
    /// Files whose blob and metadata were both removed.
    pub deleted: Vec<String>,
    pub failed: Vec<GcFailure>,
}

impl GcReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}

/// Deletes files no domain entity references anymore.
pub struct GarbageCollector {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    references: Arc<dyn ReferenceOracle>,
    cache: Option<Arc<FileCache>>,
}

impl GarbageCollector {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        references: Arc<dyn ReferenceOracle>,
    ) -> Self {
        Self {
            blobs,
            metadata,
            references,
            cache: None,
        }
    }

    /// Evict each file from `cache` as soon as its blob is deleted.
    pub fn with_cache(mut self, cache: Arc<FileCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Delete every unreferenced file of the given owner types.
    ///
    /// Blobs go first and metadata only for blobs that are gone, so metadata
    /// never disappears while its blob survives. Pending rows of in-flight
    /// uploads are candidates like any other row. Cache entries are dropped
    /// per deleted blob, so a failing metadata delete leaves nothing stale.
    #[instrument(skip(self))]
    pub async fn delete_unreferenced(&self, owner_types: &[String]) -> Result<GcReport, FileError> {
        let candidates = self.metadata.list_by_owner_types(owner_types).await?;
        if candidates.is_empty() {
            return Ok(GcReport::default());
        }

        let referenced: HashSet<String> = self
            .references
            .referenced_names(&candidates)
            .await
            .map_err(FileError::References)?;

        let mut report = GcReport {
            scanned: candidates.len(),
            referenced: referenced.len(),
            ..Default::default()
        };

        for name in candidates.into_iter().filter(|n| !referenced.contains(n)) {
            match self.blobs.delete(&name).await {
                Ok(_) => {
                    if let Some(cache) = &self.cache {
                        cache.invalidate(&name).await;
                    }
                    report.deleted.push(name);
                }
                Err(e) => {
                    warn!(unique_name = %name, error = %e, "Failed to delete blob, keeping metadata");
                    report.failed.push(GcFailure {
                        unique_name: name,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.deleted.is_empty() {
            self.metadata.delete_all(&report.deleted).await?;
        }

        info!(
            scanned = report.scanned,
            deleted = report.deleted_count(),
            failed = report.failed.len(),
            "Unreferenced files swept"
        );
        Ok(report)
    }
}

/// Run the collector periodically as a background task.
///
/// `config.interval_secs` must be non-zero.
pub async fn run_gc_task(gc: Arc<GarbageCollector>, config: GcConfig) {
    info!(
        interval_secs = config.interval_secs,
        owner_types = ?config.owner_types,
        "Starting file garbage collector"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));

    loop {
        interval.tick().await;

        if let Err(e) = gc.delete_unreferenced(&config.owner_types).await {
            error!(error = %e, "File garbage collection failed");
        }
    }
}
