//! Resource fetching and the default document loader.

use super::parser::normalize_markup;
use crate::{CacheMode, Document, Error, LoadOptions, Loader, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

/// Configuration for HTTP fetching
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Timeout for each request in milliseconds
    pub timeout_ms: u64,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("rasterhtml/{}", env!("CARGO_PKG_VERSION")),
            timeout_ms: 30000,
            headers: HashMap::new(),
        }
    }
}

/// A fetched resource
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    /// Final location after redirects
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Response store that can be handed around as a [`CacheBucket`](crate::CacheBucket).
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, Fetched>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Fetched> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(url)
            .cloned()
    }

    pub fn insert(&self, url: &str, fetched: Fetched) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(url.to_string(), fetched);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetches `http(s)` URLs with reqwest and everything else from disk.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let ua = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| Error::ConfigError(format!("Invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, ua);
        for (k, v) in &config.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| Error::ConfigError(format!("Invalid header name {}: {}", k, e)))?;
            let value = HeaderValue::from_str(v).map_err(|e| {
                Error::ConfigError(format!("Invalid header value for {}: {}", k, e))
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Fetch `location`, honoring the cache mode and bucket in `options`.
    pub async fn fetch(&self, location: &str, options: &LoadOptions) -> Result<Fetched> {
        let bucket = match options.cache {
            Some(CacheMode::Repeated) => options
                .cache_bucket
                .as_ref()
                .and_then(|b| b.downcast_ref::<ResponseCache>()),
            _ => None,
        };
        if let Some(hit) = bucket.and_then(|cache| cache.get(location)) {
            debug!("cache hit for {}", location);
            return Ok(hit);
        }

        let fetched = match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                self.fetch_http(url, options.cache).await?
            }
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::LoadError(format!("Invalid file URL {}", location)))?;
                read_file(path, location).await?
            }
            Ok(url) => {
                return Err(Error::LoadError(format!("Unsupported scheme {}", url.scheme())));
            }
            Err(_) => read_file(PathBuf::from(location), location).await?,
        };

        if let Some(cache) = bucket {
            cache.insert(location, fetched.clone());
        }
        Ok(fetched)
    }

    async fn fetch_http(&self, mut url: Url, cache: Option<CacheMode>) -> Result<Fetched> {
        let mut request_headers = HeaderMap::new();
        if cache == Some(CacheMode::None) {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();
            url.query_pairs_mut().append_pair("_", &stamp.to_string());
            request_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }

        let response = self.client.get(url).headers(request_headers).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::LoadError(format!("HTTP status {}", status.as_u16())));
        }
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await?.to_vec();
        Ok(Fetched {
            url: final_url,
            content_type,
            body,
        })
    }
}

async fn read_file(path: PathBuf, location: &str) -> Result<Fetched> {
    let body = tokio::fs::read(&path).await?;
    Ok(Fetched {
        url: location.to_string(),
        content_type: None,
        body,
    })
}

/// Message of every error returned by [`HttpLoader`].
pub const LOAD_FAILURE_MESSAGE: &str = "Unable to load page";

/// Default loader: fetches a page and parses it with [`HtmlParser`](super::HtmlParser).
#[derive(Clone)]
pub struct HttpLoader {
    fetcher: Arc<Fetcher>,
}

impl HttpLoader {
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        Ok(Self::with_fetcher(Arc::new(Fetcher::new(config)?)))
    }

    pub fn with_fetcher(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

impl Loader for HttpLoader {
    fn load_document<'a>(
        &'a self,
        url: &'a str,
        options: &'a LoadOptions,
    ) -> BoxFuture<'a, Result<Document>> {
        async move {
            match self.fetcher.fetch(url, options).await {
                Ok(fetched) => {
                    let markup = normalize_markup(&fetched.text());
                    Ok(Document::new(markup).with_url(fetched.url))
                }
                Err(e) => {
                    warn!("loading {} failed: {}", url, e);
                    Err(Error::LoadError(LOAD_FAILURE_MESSAGE.to_string()))
                }
            }
        }
        .boxed()
    }
}
