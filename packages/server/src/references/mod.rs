//! Liveness oracle: which stored files are still referenced by a domain entity.

mod memory;
mod sql;

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::DbErr;

pub use memory::MemoryReferences;
pub use sql::SqlReferenceOracle;

#[async_trait]
pub trait ReferenceOracle: Send + Sync {
    /// Returns the subset of `candidates` that some live owner still references.
    async fn referenced_names(&self, candidates: &[String]) -> Result<HashSet<String>, DbErr>;
}
