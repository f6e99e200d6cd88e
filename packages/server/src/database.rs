use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::{file_metadata, file_ref};

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(50)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(60))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("stowage_server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Create the secondary indexes the sweep queries rely on.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // SELECT unique_name FROM file_metadata WHERE owner_type IN (...)
    let owner_type = Index::create()
        .if_not_exists()
        .name("idx_file_metadata_owner_type")
        .table(file_metadata::Entity)
        .col(file_metadata::Column::OwnerType)
        .to_string(PostgresQueryBuilder);

    // SELECT DISTINCT unique_name FROM file_ref WHERE unique_name IN (...)
    let ref_name = Index::create()
        .if_not_exists()
        .name("idx_file_ref_unique_name")
        .table(file_ref::Entity)
        .col(file_ref::Column::UniqueName)
        .to_string(PostgresQueryBuilder);

    for (name, stmt) in [
        ("idx_file_metadata_owner_type", owner_type),
        ("idx_file_ref_unique_name", ref_name),
    ] {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {name} exists"),
            Err(e) => warn!("Failed to create index {name}: {e}"),
        }
    }

    Ok(())
}
