//! Unix-socket renderer client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use layerhub_core::blob::BlobStore;
use layerhub_core::error::RenderError;
use layerhub_core::ids;
use layerhub_core::render::{RenderParams, Renderer};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::Semaphore;

use crate::protocol::{decode_response, encode_request};

/// Default socket the renderer listens on.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/rendererSocket";

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub socket_path: PathBuf,
    /// Upper bound on one render, connect through response.
    pub timeout: Duration,
    /// Renders allowed in flight at once.
    pub max_concurrency: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            timeout: Duration::from_secs(30),
            max_concurrency: 4,
        }
    }
}

/// Renders through the socket and uploads previews to blob storage.
pub struct SocketRenderer {
    socket_path: PathBuf,
    timeout: Duration,
    permits: Arc<Semaphore>,
    blobs: Arc<dyn BlobStore>,
}

impl SocketRenderer {
    pub fn new(config: RendererConfig, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            socket_path: config.socket_path,
            timeout: config.timeout,
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            blobs,
        }
    }

    /// One request/response exchange on a fresh connection.
    async fn exchange(&self, body: &[u8]) -> Result<Vec<u8>, RenderError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(RenderError::Connect)?;

        stream.write_all(body).await.map_err(RenderError::Write)?;
        // Half-close so the renderer sees the end of the request.
        stream.shutdown().await.map_err(RenderError::Write)?;

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .await
            .map_err(RenderError::Read)?;
        Ok(response)
    }
}

#[async_trait]
impl Renderer for SocketRenderer {
    async fn render(&self, document: &Value, params: &RenderParams) -> Result<String, RenderError> {
        let image = self.raw_render(document, params).await?;
        let key = format!("{}.png", ids::unique_id(ids::PREVIEW_PREFIX));
        let url = self.blobs.put(&key, image).await?;
        tracing::debug!(key = %key, url = %url, "Uploaded preview");
        Ok(url)
    }

    async fn raw_render(
        &self,
        document: &Value,
        params: &RenderParams,
    ) -> Result<Vec<u8>, RenderError> {
        let body = encode_request(document, params)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RenderError::Closed)?;

        let start = Instant::now();
        let response = tokio::time::timeout(self.timeout, self.exchange(&body))
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))??;
        let image = decode_response(&response)?;

        tracing::debug!(
            request_bytes = body.len(),
            image_bytes = image.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rendered design",
        );
        Ok(image)
    }
}
