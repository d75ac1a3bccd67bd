//! Remote resource fetching seam, used when rehosting layer assets.

use async_trait::async_trait;

use crate::error::ResourceError;

#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Download the resource at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError>;
}
