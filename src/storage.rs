//! Blob store collaborator.
//!
//! The pipeline treats archive storage as an opaque keyed store; in
//! production that is S3, here the shipped implementation mirrors the
//! same contract onto a local directory. The store is constructed once
//! and injected wherever it is needed rather than living in module
//! scope, so tests can substitute their own root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from blob store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque keyed blob storage.
///
/// Keys are slash-separated paths (`uploads/<id>.zip`,
/// `extracted/<request>/<name>`), matching the S3 key convention the
/// rest of the system uses.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch a blob's bytes.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Store a blob and return a URL it can be previewed at.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StorageError>;

    /// Remove a blob. Removing a missing blob is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Produce a time-limited preview URL for a blob.
    async fn presign(&self, key: &str, ttl_seconds: u64) -> Result<String, StorageError>;
}

/// Filesystem-backed blob store rooted at a single directory.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key under the root, rejecting traversal components.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let relative = Path::new(key);
        let traversal = relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)));
        if traversal {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String, StorageError> {
        // Content type is re-derived from the key on read; the local
        // backend has nowhere to persist it.
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        self.presign(key, 0).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn presign(&self, key: &str, _ttl_seconds: u64) -> Result<String, StorageError> {
        // Local blobs are served by the preview endpoint; there is no
        // signature to expire.
        self.resolve(key)?;
        Ok(format!("/api/documents/preview?key={key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let url = store
            .put("uploads/abc.zip", b"PK\x03\x04data", "application/zip")
            .await
            .unwrap();
        assert_eq!(url, "/api/documents/preview?key=uploads/abc.zip");

        let bytes = store.get("uploads/abc.zip").await.unwrap();
        assert_eq!(bytes, b"PK\x03\x04data");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        match store.get("uploads/nope.zip").await {
            Err(StorageError::NotFound(key)) => assert_eq!(key, "uploads/nope.zip"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        store.put("a/b.bin", b"x", "application/octet-stream").await.unwrap();
        store.delete("a/b.bin").await.unwrap();
        store.delete("a/b.bin").await.unwrap();
        assert!(matches!(
            store.get("a/b.bin").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_traversal_keys_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        assert!(matches!(
            store.get("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.put("/abs/path", b"x", "text/plain").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get("").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
