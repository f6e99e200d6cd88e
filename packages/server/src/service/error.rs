use common::storage::{ChecksumError, StorageError};
use sea_orm::DbErr;
use thiserror::Error;

use crate::metadata::MetadataError;

/// Errors surfaced by the file services.
///
/// Absence is never an error here: lookups return `Ok(None)`. Everything but
/// [`FileError::Config`] can be retried.
#[derive(Debug, Error)]
pub enum FileError {
    /// Invalid service configuration, reported at construction time.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    #[error("reference lookup failed: {0}")]
    References(DbErr),

    /// A cache population failed; every waiter on that key sees the same message.
    #[error("load failed: {0}")]
    Load(String),
}
