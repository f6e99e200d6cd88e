//! File ingestion, cached retrieval and garbage collection.

mod cache;
mod error;
mod file;
mod gc;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheSettings, CachedFile, FileCache, LoadingCache};
pub use error::FileError;
pub use file::{FileService, NewFile};
pub use gc::{GarbageCollector, GcFailure, GcReport, run_gc_task};
