//! Filesystem object store
//!
//! Keys map to relative paths under a root directory, so `mdx/Page.mdx`
//! lands in `{root}/mdx/Page.mdx`.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::object_store::{validate_key, ObjectStore};
use crate::error::{Error, Result};

/// Suffix of in-flight writes, hidden from listings
const PARTIAL_SUFFIX: &str = ".partial";

/// Local filesystem object store
pub struct LocalObjectStore {
    /// Directory holding all objects
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a new local object store, creating the root if needed
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Get path for a key
    fn object_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Key for a path under the root, with `/` separators
    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(parent).await?;

        // Short sibling name: the object's own name may already be near the
        // file name length limit
        let tmp = parent.join(format!(".{}{}", uuid::Uuid::new_v4(), PARTIAL_SUFFIX));

        let written = match tokio::fs::write(&tmp, &data).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::storage(format!("Failed to write {}: {}", key, e)));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.object_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(format!("Failed to read {}: {}", key, e))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_for(&path) {
                    if key.starts_with(prefix) && !key.ends_with(PARTIAL_SUFFIX) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(tokio::fs::metadata(&self.root).await.map(|m| m.is_dir()).unwrap_or(false))
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_twice_leaves_one_object() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf()).unwrap();

        store.put("mdx/Page.mdx", Bytes::from_static(b"first")).await.unwrap();
        store.put("mdx/Page.mdx", Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(store.list("mdx/").await.unwrap(), vec!["mdx/Page.mdx"]);
        assert_eq!(
            store.get("mdx/Page.mdx").await.unwrap().unwrap(),
            Bytes::from_static(b"second")
        );
        assert!(dir.path().join("mdx").join("Page.mdx").is_file());
    }

    #[tokio::test]
    async fn test_long_title_near_name_limit() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf()).unwrap();

        // 70 three-byte characters plus ".mdx": 214 bytes, a legal file name
        let key = crate::export::formatter::document_key(&"\u{3042}".repeat(70));
        let file_name = key.rsplit('/').next().unwrap();
        assert_eq!(file_name.len(), 214);

        store.put(&key, Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap(), Bytes::from_static(b"x"));
        assert_eq!(store.list("mdx/").await.unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf()).unwrap();

        // A directory in the way makes the rename fail
        std::fs::create_dir_all(dir.path().join("mdx").join("Page.mdx").join("inner")).unwrap();
        assert!(store.put("mdx/Page.mdx", Bytes::from_static(b"x")).await.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("mdx"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(PARTIAL_SUFFIX))
            .collect();
        assert!(leftovers.is_empty(), "left {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_missing_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf()).unwrap();

        assert!(store.get("mdx/none.mdx").await.unwrap().is_none());
        store.delete("mdx/none.mdx").await.unwrap();

        store.put("sync/checkpoint.json", Bytes::from_static(b"{}")).await.unwrap();
        store.delete("sync/checkpoint.json").await.unwrap();
        assert!(store.list("").await.unwrap().is_empty());
        assert!(store.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().join("objects")).unwrap();

        let err = store.put("../outside", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
        assert!(!dir.path().join("outside").exists());
    }
}
