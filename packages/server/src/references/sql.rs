use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect};

use super::ReferenceOracle;
use crate::entity::file_ref;

const CHUNK_SIZE: usize = 500;

/// Reads liveness from the `file_ref` table.
#[derive(Clone)]
pub struct SqlReferenceOracle {
    db: DatabaseConnection,
}

impl SqlReferenceOracle {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReferenceOracle for SqlReferenceOracle {
    async fn referenced_names(&self, candidates: &[String]) -> Result<HashSet<String>, DbErr> {
        let mut referenced = HashSet::new();
        for chunk in candidates.chunks(CHUNK_SIZE) {
            let names: Vec<String> = file_ref::Entity::find()
                .select_only()
                .column(file_ref::Column::UniqueName)
                .distinct()
                .filter(file_ref::Column::UniqueName.is_in(chunk.to_vec()))
                .into_tuple()
                .all(&self.db)
                .await?;
            referenced.extend(names);
        }
        Ok(referenced)
    }
}
