use std::time::Duration;

/// Failures of the layer codec, in either wire format.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document encode error: {0}")]
    DocumentEncode(#[from] bson::ser::Error),

    #[error("Document decode error: {0}")]
    DocumentDecode(#[from] bson::de::Error),

    #[error("Unknown layer type '{0}'")]
    UnknownKind(String),

    #[error("Layer has no type")]
    MissingKind,

    #[error("Malformed layer: {0}")]
    Malformed(String),
}

/// Structured store failures, carrying the driver message.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Blob storage failures.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob key '{0}'")]
    InvalidKey(String),

    #[error("Blob I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob backend error: {0}")]
    Backend(String),
}

/// Failures while rehosting third-party layer resources.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Invalid resource URL '{0}'")]
    InvalidUrl(String),

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to upload resource: {0}")]
    Upload(#[from] BlobError),
}

/// Failures talking to the renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to encode render request: {0}")]
    Encode(serde_json::Error),

    #[error("Renderer connection failed: {0}")]
    Connect(std::io::Error),

    #[error("Failed to send render request: {0}")]
    Write(std::io::Error),

    #[error("Failed to read render response: {0}")]
    Read(std::io::Error),

    #[error("Malformed render response: {0}")]
    Decode(serde_json::Error),

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Renderer returned an invalid image: {0}")]
    Image(String),

    #[error("Failed to upload preview: {0}")]
    Upload(#[from] BlobError),

    #[error("Render timed out after {0:?}")]
    Timeout(Duration),

    #[error("Renderer is shut down")]
    Closed,
}

/// Error returned by every orchestrator operation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Codec(CodecError::Json(err))
    }
}
