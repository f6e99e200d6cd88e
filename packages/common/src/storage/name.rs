use super::error::StorageError;

/// Longest accepted blob name, in bytes.
const MAX_NAME_LEN: usize = 255;

/// Validates a blob name before it is used as a storage key.
///
/// Names must be flat: no path separators, no `..`, no leading dot, no
/// control characters.
pub fn validate_blob_name(name: &str) -> Result<&str, StorageError> {
    if name.is_empty() {
        return Err(StorageError::InvalidName("name cannot be empty".into()));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(StorageError::InvalidName(format!(
            "name exceeds {MAX_NAME_LEN} bytes"
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(StorageError::InvalidName(
            "control characters are not allowed".into(),
        ));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(StorageError::InvalidName(
            "path separators are not allowed".into(),
        ));
    }

    if name.starts_with('.') {
        return Err(StorageError::InvalidName(
            "names starting with '.' are not allowed".into(),
        ));
    }

    Ok(name)
}
