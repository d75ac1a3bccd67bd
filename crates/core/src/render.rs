//! Renderer seam.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RenderError;

/// Render-time substitutions, e.g. values for dynamic text keys.
pub type RenderParams = Map<String, Value>;

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `document` and upload the PNG, returning its public URL.
    async fn render(&self, document: &Value, params: &RenderParams) -> Result<String, RenderError>;

    /// Render `document` and return the PNG bytes.
    async fn raw_render(
        &self,
        document: &Value,
        params: &RenderParams,
    ) -> Result<Vec<u8>, RenderError>;
}
