//! Shared key generation for storage backends.
//!
//! Key format: `{prefix}/{stored_name}`.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could escape the storage root.
pub fn validate_storage_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Build the storage key for a stored name under `prefix`.
pub fn build_storage_key(prefix: &str, stored_name: &str) -> StorageResult<String> {
    if stored_name.contains('/') {
        return Err(StorageError::InvalidKey(format!(
            "Stored name must not contain '/': {}",
            stored_name
        )));
    }
    let prefix = prefix.trim_matches('/');
    let key = if prefix.is_empty() {
        stored_name.to_string()
    } else {
        format!("{}/{}", prefix, stored_name)
    };
    validate_storage_key(&key)?;
    Ok(key)
}
