mod checksum;
mod error;
mod name;
mod traits;

pub mod filesystem;
pub mod memory;
#[cfg(feature = "object-storage")]
pub mod object;

pub use checksum::{
    Checksum, ChecksumAlgorithm, ChecksumEncoding, ChecksumError, ChecksumHandle, ChecksumReader,
};
pub use error::StorageError;
pub use name::validate_blob_name;
pub use traits::{BlobStore, BoxReader};
