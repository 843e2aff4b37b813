//! Network access for intercepted requests.
//!
//! ### Response typing
//! - Final URL on the scope origin: `basic`
//! - Cross-origin, CORS mode: `cors`
//! - Cross-origin, no-cors mode: `opaque` (status 0, empty body)
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//!
//! Non-2xx statuses are not errors here; callers decide what to do with them.

pub mod request;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use request::{CacheMode, Destination, Request, RequestMode};
pub use self::url::{UrlError, is_fetchable_scheme, parse_scope, resolve, resolve_fetchable};

use aide_core::{Error, Response, ResponseType};

/// The network as seen by the offline controller.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a GET for `request`.
    ///
    /// Fails only when no response was obtained at all (offline, DNS,
    /// timeout, oversized body).
    async fn fetch(&self, request: &Request, cache: CacheMode) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "aide-memoire/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "aide-memoire/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app(config: &aide_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

fn classify(err: &reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
    scope: ::url::Url,
}

impl HttpNetwork {
    /// Create a network client whose same-origin checks use `scope`.
    pub fn new(config: FetchConfig, scope: ::url::Url) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config, scope })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn response_type(&self, final_url: &::url::Url, mode: RequestMode) -> ResponseType {
        if final_url.origin() == self.scope.origin() {
            ResponseType::Basic
        } else if mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request, cache: CacheMode) -> Result<Response, Error> {
        let start = Instant::now();

        let mut builder = self.http.get(request.url.as_str());
        if cache == CacheMode::Reload {
            builder = builder.header(header::CACHE_CONTROL, "no-cache").header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await.map_err(|e| classify(&e))?;
        let final_url = response.url().clone();

        let response_type = self.response_type(&final_url, request.mode);
        if response_type == ResponseType::Opaque {
            tracing::debug!("opaque response for {}", final_url);
            return Ok(Response::opaque(final_url.as_str()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body: Bytes = response.bytes().await.map_err(|e| classify(&e))?;
        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            request.url,
            final_url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { url: final_url.to_string(), status, response_type, headers, body })
    }
}
