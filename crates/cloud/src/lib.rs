//! Blob storage backends.
//!
//! [`S3BlobStore`] serves production traffic through a bucket (optionally
//! fronted by a CDN); [`LocalBlobStore`] keeps objects in a directory for
//! development and tests.

pub mod local;
pub mod s3;

pub use local::LocalBlobStore;
pub use s3::S3BlobStore;

use layerhub_core::error::BlobError;

/// MIME type for an object key, from its extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "json" | "layerhub" => "application/json",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Keys are flat object names: no separators, no parent references.
pub fn validate_key(key: &str) -> Result<(), BlobError> {
    let valid = !key.is_empty()
        && !key.contains('/')
        && !key.contains('\\')
        && key != "."
        && key != "..";
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidKey(key.to_string()))
    }
}
