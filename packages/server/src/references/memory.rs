use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashSet;
use sea_orm::DbErr;

use super::ReferenceOracle;

/// Reference set held in memory, maintained by the caller.
#[derive(Default)]
pub struct MemoryReferences {
    names: DashSet<String>,
}

impl MemoryReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, unique_name: impl Into<String>) {
        self.names.insert(unique_name.into());
    }

    pub fn remove(&self, unique_name: &str) -> bool {
        self.names.remove(unique_name).is_some()
    }
}

#[async_trait]
impl ReferenceOracle for MemoryReferences {
    async fn referenced_names(&self, candidates: &[String]) -> Result<HashSet<String>, DbErr> {
        Ok(candidates
            .iter()
            .filter(|name| self.names.contains(name.as_str()))
            .cloned()
            .collect())
    }
}
