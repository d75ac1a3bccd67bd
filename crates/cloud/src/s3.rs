//! S3 blob store.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use layerhub_core::blob::BlobStore;
use layerhub_core::error::BlobError;
use reqwest::Url;

use crate::{content_type_for_key, validate_key};

/// Objects live flat in one bucket. Public URLs go through the CDN when one
/// is configured, otherwise straight to the bucket endpoint.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    cdn_base: Option<Url>,
}

impl S3BlobStore {
    /// Build a client for `region` from the default credential chain.
    pub async fn connect(
        region: &str,
        bucket: &str,
        cdn_base: Option<&str>,
    ) -> Result<Self, BlobError> {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        Self::new(Client::new(&config), bucket, cdn_base)
    }

    pub fn new(client: Client, bucket: &str, cdn_base: Option<&str>) -> Result<Self, BlobError> {
        let cdn_base = cdn_base
            .filter(|base| !base.is_empty())
            .map(parse_base_url)
            .transpose()?;
        Ok(Self {
            client,
            bucket: bucket.to_string(),
            cdn_base,
        })
    }

    /// Public URL of `key`.
    pub fn public_url(&self, key: &str) -> Result<String, BlobError> {
        public_url(&self.bucket, self.cdn_base.as_ref(), key)
    }
}

fn parse_base_url(base: &str) -> Result<Url, BlobError> {
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).map_err(|e| BlobError::Backend(format!("invalid CDN base URL '{base}': {e}")))
}

fn public_url(bucket: &str, cdn_base: Option<&Url>, key: &str) -> Result<String, BlobError> {
    match cdn_base {
        Some(base) => base
            .join(key)
            .map(String::from)
            .map_err(|e| BlobError::Backend(format!("invalid object key '{key}': {e}"))),
        None => Ok(format!("https://{bucket}.s3.amazonaws.com/{key}")),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
        validate_key(key)?;
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type_for_key(key))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| BlobError::Backend(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(bucket = %self.bucket, key, size, "Uploaded object");
        self.public_url(key)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        validate_key(key)?;

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_no_such_key() {
                    return Err(BlobError::NotFound(key.to_string()));
                }
                return Err(BlobError::Backend(DisplayErrorContext(&err).to_string()));
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Backend(format!("failed to read object '{key}': {e}")))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        validate_key(key)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| BlobError::Backend(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(bucket = %self.bucket, key, "Deleted object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_url_without_cdn() {
        let url = public_url("layerhub-assets", None, "preview_abc.png").unwrap();
        assert_eq!(url, "https://layerhub-assets.s3.amazonaws.com/preview_abc.png");
    }

    #[test]
    fn cdn_url_joins_key() {
        let base = parse_base_url("https://cdn.example.com/assets").unwrap();
        let url = public_url("bucket", Some(&base), "img_abc.jpeg").unwrap();
        assert_eq!(url, "https://cdn.example.com/assets/img_abc.jpeg");
    }

    #[test]
    fn invalid_cdn_base_is_rejected() {
        assert!(parse_base_url("not a url").is_err());
    }
}
