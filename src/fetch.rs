//! Image retrieval: URL → encoded bytes.
//!
//! [`ImageFetcher`] is the contract the pipeline depends on. [`HttpFetcher`]
//! is the production implementation:
//!
//! | Scheme | Transport |
//! |---|---|
//! | `http`, `https` | `reqwest::blocking::Client` (rustls) |
//! | `file` | `std::fs::read`, only with `fetch.allow_file_urls` |
//!
//! Every call makes exactly one retrieval. There is no retry and no cache;
//! callers that want either wrap the fetcher.

use crate::config::FetchConfig;
use reqwest::Url;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed reading response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{url} is larger than the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },
}

/// Retrieves raw encoded image bytes.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Parse `url` and require a scheme [`HttpFetcher`] can serve.
pub fn parse_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" | "file" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Fetches `http(s)://` URLs, and `file://` URLs when allowed.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_bytes: u64,
    allow_file_urls: bool,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            max_bytes: config.max_bytes,
            allow_file_urls: config.allow_file_urls,
        })
    }

    fn fetch_http(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let url_str = url.to_string();
        let request_err = |source| FetchError::Request {
            url: url_str.clone(),
            source,
        };

        let response = self.client.get(url.clone()).send().map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(self.too_large(&url_str));
        }

        // Read one byte past the limit so an oversized chunked body is detected.
        let mut body = Vec::new();
        response
            .take(self.max_bytes + 1)
            .read_to_end(&mut body)
            .map_err(|source| FetchError::Body {
                url: url_str.clone(),
                source,
            })?;
        if body.len() as u64 > self.max_bytes {
            return Err(self.too_large(&url_str));
        }
        Ok(body)
    }

    fn fetch_file(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        if !self.allow_file_urls {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: "file URLs are disabled (set fetch.allow_file_urls)".to_string(),
            });
        }
        let path = url.to_file_path().map_err(|()| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "not a local file path".to_string(),
        })?;
        let len = std::fs::metadata(&path)
            .map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            })?
            .len();
        if len > self.max_bytes {
            return Err(self.too_large(url.as_str()));
        }
        std::fs::read(&path).map_err(|source| FetchError::Io { path, source })
    }

    fn too_large(&self, url: &str) -> FetchError {
        FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        }
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = parse_url(url)?;
        tracing::debug!(url = %parsed, "fetching image");
        if parsed.scheme() == "file" {
            self.fetch_file(parsed)
        } else {
            self.fetch_http(parsed)
        }
    }
}
