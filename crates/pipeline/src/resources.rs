//! Rehosting of third-party images into owned blob storage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use layerhub_core::blob::BlobStore;
use layerhub_core::error::ResourceError;
use layerhub_core::ids;
use layerhub_core::layer::{static_images_mut, Layer};
use layerhub_core::resource::ResourceFetcher;
use reqwest::Url;

/// Media feeds whose images are copied before a design is saved.
pub const DEFAULT_FEED_DOMAINS: [&str; 2] = ["images.pexels.com", "pixabay.com"];

/// Hostnames treated as foreign image sources. A host matches when it
/// equals a configured domain or is a subdomain of one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDomains {
    domains: Vec<String>,
}

impl FeedDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    /// Parse a comma-separated list such as `images.pexels.com,pixabay.com`.
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    pub fn matches_url(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| self.matches_host(host))
    }
}

impl Default for FeedDomains {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_DOMAINS)
    }
}

/// Blob key for a rehosted image: a fresh `img_` id plus the source
/// file's extension, when it has a plain one.
pub fn rehosted_key(source: &Url) -> String {
    let id = ids::unique_id(ids::IMAGE_PREFIX);
    let extension = source
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{id}.{ext}"),
        None => id,
    }
}

/// Copies feed-hosted `StaticImage` sources into owned storage and
/// rewrites them, descending into groups.
pub struct ResourcePersister {
    fetcher: Arc<dyn ResourceFetcher>,
    blobs: Arc<dyn BlobStore>,
    domains: FeedDomains,
}

impl ResourcePersister {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        blobs: Arc<dyn BlobStore>,
        domains: FeedDomains,
    ) -> Self {
        Self {
            fetcher,
            blobs,
            domains,
        }
    }

    /// Rehost every matching image, returning how many were rewritten.
    ///
    /// Sources are only rewritten once every upload has succeeded, so a
    /// failure leaves `layers` untouched.
    pub async fn persist(&self, layers: &mut [Layer]) -> Result<usize, ResourceError> {
        let mut images = static_images_mut(layers);

        let mut rewrites = Vec::new();
        for (index, image) in images.iter().enumerate() {
            let Ok(source) = Url::parse(&image.src) else {
                continue;
            };
            if !self.domains.matches_url(&source) {
                continue;
            }

            let bytes = self.fetcher.fetch(&image.src).await?;
            let key = rehosted_key(&source);
            let url = self.blobs.put(&key, bytes).await?;
            tracing::debug!(source = %image.src, key = %key, "Rehosted image");
            rewrites.push((index, url));
        }

        let count = rewrites.len();
        for (index, url) in rewrites {
            images[index].src = url;
        }
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// HTTP fetcher
// ---------------------------------------------------------------------------

/// [`ResourceFetcher`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let fetch_error = |message: String| ResourceError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                ResourceError::InvalidUrl(url.to_string())
            } else {
                fetch_error(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        Ok(body.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_matches_domain_and_subdomains() {
        let domains = FeedDomains::from_list("images.pexels.com, pixabay.com");

        assert!(domains.matches_host("images.pexels.com"));
        assert!(domains.matches_host("pixabay.com"));
        assert!(domains.matches_host("cdn.pixabay.com"));
        assert!(domains.matches_host("CDN.Pixabay.com"));
        assert!(!domains.matches_host("notpixabay.com"));
        assert!(!domains.matches_host("pexels.com"));
        assert!(!domains.matches_host("pixabay.com.evil.test"));
    }

    #[test]
    fn url_matching_uses_the_host_only() {
        let domains = FeedDomains::default();
        let feed = Url::parse("https://images.pexels.com/photos/1/a.jpeg").unwrap();
        let owned = Url::parse("https://cdn.layerhub.test/images.pexels.com.png").unwrap();

        assert!(domains.matches_url(&feed));
        assert!(!domains.matches_url(&owned));
    }

    #[test]
    fn blank_entries_are_dropped() {
        assert!(FeedDomains::from_list(" , ,").is_empty());
        assert_eq!(FeedDomains::from_list(".pixabay.com,"), FeedDomains::new(["pixabay.com"]));
    }

    #[test]
    fn rehosted_key_keeps_extension() {
        let url = Url::parse("https://images.pexels.com/photos/2/photo.jpeg?w=640").unwrap();
        let key = rehosted_key(&url);
        assert!(key.starts_with("img_"));
        assert!(key.ends_with(".jpeg"));
        assert_eq!(key.len(), "img_".len() + ids::ID_LENGTH + ".jpeg".len());
    }

    #[test]
    fn rehosted_key_without_extension() {
        let url = Url::parse("https://pixabay.com/get/abcdef").unwrap();
        let key = rehosted_key(&url);
        assert!(key.starts_with("img_"));
        assert!(!key.contains('.'));
    }

    #[test]
    fn http_fetcher_builds() {
        HttpFetcher::new(Duration::from_secs(5)).unwrap();
    }
}
