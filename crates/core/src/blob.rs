//! Blob storage seam.

use async_trait::async_trait;

use crate::error::BlobError;

/// Flat key/value blob storage with public URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, returning the public URL of the object.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, BlobError>;

    /// Fetch the object under `key`. A missing key is [`BlobError::NotFound`].
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Remove the object under `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}
