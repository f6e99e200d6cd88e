pub mod file_metadata;
pub mod file_ref;
