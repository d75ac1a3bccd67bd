//! Filesystem blob store for development and tests.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use layerhub_core::blob::BlobStore;
use layerhub_core::error::BlobError;

use crate::validate_key;

/// Stores each object as a file named after its key under `root`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    /// `base_url` is prefixed to keys to form public URLs; a trailing slash
    /// is added when missing.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            root: root.into(),
            base_url,
        }
    }

    /// A store whose URLs are `file://` paths into `root`.
    pub fn with_file_urls(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let base_url = format!("file://{}", root.display());
        Self::new(root, base_url)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, path = %path.display(), "Stored blob");
        Ok(format!("{}{key}", self.base_url))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(BlobError::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
