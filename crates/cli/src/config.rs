use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use layerhub_pipeline::resources::DEFAULT_FEED_DOMAINS;
use layerhub_pipeline::FeedDomains;
use layerhub_renderer::client::DEFAULT_SOCKET_PATH;
use layerhub_renderer::{ProcessConfig, ProcessError, RendererConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Where blobs (documents, previews, rehosted images) are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBackend {
    Local {
        dir: PathBuf,
        /// `None` means `file://` URLs into `dir`.
        base_url: Option<String>,
    },
    S3 {
        region: String,
        bucket: String,
        cdn_base: Option<String>,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Only required by commands that touch the structured store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub blob: BlobBackend,
    pub renderer_socket: PathBuf,
    /// Command used to spawn a local renderer; `None` when one is already
    /// running.
    pub renderer_command: Option<String>,
    pub renderer_dir: PathBuf,
    pub renderer_startup_timeout: Duration,
    pub render_timeout: Duration,
    pub render_max_concurrency: usize,
    pub feed_domains: FeedDomains,
    pub fetch_timeout: Duration,
    pub document_write_retries: u32,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                         | Default                          |
    /// |---------------------------------|----------------------------------|
    /// | `DATABASE_URL`                  | unset                            |
    /// | `DATABASE_MAX_CONNECTIONS`      | `10`                             |
    /// | `BLOB_BACKEND`                  | `local` (`local` or `s3`)        |
    /// | `AWS_REGION`, `AWS_BUCKET`      | required for `s3`                |
    /// | `CDN_BASE`                      | unset                            |
    /// | `LOCAL_BLOB_DIR`                | `./blobs`                        |
    /// | `LOCAL_BLOB_BASE_URL`           | `file://` URLs into the dir      |
    /// | `RENDERER_SOCKET`               | `/tmp/rendererSocket`            |
    /// | `RENDERER_COMMAND`              | unset (do not spawn)             |
    /// | `RENDERER_DIR`                  | `./renderer`                     |
    /// | `RENDERER_STARTUP_TIMEOUT_SECS` | `30`                             |
    /// | `RENDER_TIMEOUT_SECS`           | `30`                             |
    /// | `RENDER_MAX_CONCURRENCY`        | `4`                              |
    /// | `FEED_IMAGE_DOMAINS`            | `images.pexels.com,pixabay.com`  |
    /// | `FETCH_TIMEOUT_SECS`            | `20`                             |
    /// | `DOCUMENT_WRITE_RETRIES`        | `3`                              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let blob = match env.get("BLOB_BACKEND").as_deref().unwrap_or("local") {
            "local" => BlobBackend::Local {
                dir: PathBuf::from(env.get("LOCAL_BLOB_DIR").unwrap_or_else(|| "./blobs".into())),
                base_url: env.get("LOCAL_BLOB_BASE_URL"),
            },
            "s3" => BlobBackend::S3 {
                region: env.require("AWS_REGION")?,
                bucket: env.require("AWS_BUCKET")?,
                cdn_base: env.get("CDN_BASE"),
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "BLOB_BACKEND",
                    expected: "'local' or 's3'",
                    value: other.to_string(),
                })
            }
        };

        let render_max_concurrency: usize =
            env.parse("RENDER_MAX_CONCURRENCY", 4, "a positive integer")?;
        if render_max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "RENDER_MAX_CONCURRENCY",
                expected: "a positive integer",
                value: "0".into(),
            });
        }

        Ok(Self {
            database_url: env.get("DATABASE_URL"),
            database_max_connections: env.parse("DATABASE_MAX_CONNECTIONS", 10, "a valid u32")?,
            blob,
            renderer_socket: PathBuf::from(
                env.get("RENDERER_SOCKET")
                    .unwrap_or_else(|| DEFAULT_SOCKET_PATH.into()),
            ),
            renderer_command: env.get("RENDERER_COMMAND"),
            renderer_dir: PathBuf::from(env.get("RENDERER_DIR").unwrap_or_else(|| "./renderer".into())),
            renderer_startup_timeout: env.secs("RENDERER_STARTUP_TIMEOUT_SECS", 30)?,
            render_timeout: env.secs("RENDER_TIMEOUT_SECS", 30)?,
            render_max_concurrency,
            feed_domains: env
                .get("FEED_IMAGE_DOMAINS")
                .map(|list| FeedDomains::from_list(&list))
                .unwrap_or_else(|| FeedDomains::new(DEFAULT_FEED_DOMAINS)),
            fetch_timeout: env.secs("FETCH_TIMEOUT_SECS", 20)?,
            document_write_retries: env.parse("DOCUMENT_WRITE_RETRIES", 3, "a valid u32")?,
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn renderer(&self) -> RendererConfig {
        RendererConfig {
            socket_path: self.renderer_socket.clone(),
            timeout: self.render_timeout,
            max_concurrency: self.render_max_concurrency,
        }
    }

    /// Process settings when a renderer should be spawned.
    pub fn renderer_process(&self) -> Option<Result<ProcessConfig, ProcessError>> {
        let command = self.renderer_command.as_deref()?;
        Some(ProcessConfig::from_command_line(
            command,
            &self.renderer_dir,
            &self.renderer_socket,
            self.renderer_startup_timeout,
        ))
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn require(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn parse<T: FromStr>(
        &self,
        name: &'static str,
        default: T,
        expected: &'static str,
    ) -> Result<T, ConfigError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name,
                expected,
                value,
            }),
        }
    }

    fn secs(&self, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
        self.parse(name, default, "a whole number of seconds")
            .map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
