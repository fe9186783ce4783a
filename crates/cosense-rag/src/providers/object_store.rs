//! Object store provider trait for exported documents

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};

/// Trait for key-value object storage
///
/// `put` overwrites whatever is stored under the key, so re-exporting a page
/// never creates a second object.
///
/// Implementations:
/// - `LocalObjectStore`: Local filesystem
/// - `MemoryObjectStore`: Process memory
/// - `GcsObjectStore`: Google Cloud Storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object, replacing any previous value
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Retrieve an object
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Delete an object (no-op if absent)
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Reject keys that could escape the store root
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(Error::InvalidKey(key.to_string()));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("mdx/Page.mdx").is_ok());
        assert!(validate_key("mdx/...mdx").is_ok());
        assert!(validate_key("sync/checkpoint.json").is_ok());

        for bad in ["", "/etc/passwd", "mdx/../secret", "mdx//a", "./a", "a\\b", "mdx/"] {
            assert!(validate_key(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
