use std::sync::Arc;

use anyhow::Context;
use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::memory::MemoryBlobStore;
use stowage_server::config::{AppConfig, StorageBackend, StorageConfig};
use stowage_server::database::{ensure_indexes, init_db};
use stowage_server::metadata::{MemoryMetadataStore, MetadataStore, SqlMetadataStore};
use stowage_server::references::{MemoryReferences, ReferenceOracle, SqlReferenceOracle};
use stowage_server::service::run_gc_task;
use stowage_server::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let blobs = build_blob_store(&config.storage).await?;

    let (metadata, references): (Arc<dyn MetadataStore>, Arc<dyn ReferenceOracle>) =
        match config.database.url.as_deref() {
            Some(url) => {
                let db = init_db(url).await.context("Failed to connect to database")?;
                ensure_indexes(&db).await?;
                info!("Database connected and schema synced");
                (
                    Arc::new(SqlMetadataStore::new(db.clone())),
                    Arc::new(SqlReferenceOracle::new(db)),
                )
            }
            None => {
                warn!("No database configured, metadata is kept in memory");
                (
                    Arc::new(MemoryMetadataStore::new()),
                    Arc::new(MemoryReferences::new()),
                )
            }
        };

    let state = AppState::new(config, blobs, metadata, references)?;

    let gc_config = state.config.gc.clone();
    if gc_config.interval_secs > 0 && !gc_config.owner_types.is_empty() {
        tokio::spawn(run_gc_task(Arc::clone(&state.gc), gc_config));
    } else {
        info!("Periodic garbage collection disabled");
    }

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = stowage_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn build_blob_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Filesystem => {
            info!(path = %config.data_dir.display(), "Using filesystem blob store");
            Arc::new(FilesystemBlobStore::new(config.data_dir.clone(), config.max_blob_size).await?)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory blob store, contents are lost on restart");
            Arc::new(MemoryBlobStore::with_max_size(config.max_blob_size))
        }
        #[cfg(feature = "object-storage")]
        StorageBackend::Object => {
            info!(bucket = %config.object.bucket, "Using object blob store");
            Arc::new(common::storage::object::ObjectBlobStore::new(
                &config.object,
                config.max_blob_size,
            )?)
        }
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::Object => {
            anyhow::bail!("storage.backend = \"object\" requires the object-storage feature")
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
