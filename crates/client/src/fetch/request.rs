//! Intercepted request descriptors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Request mode, as set by whoever issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    SameOrigin,
    /// Cross-origin reads yield opaque responses.
    NoCors,
    #[default]
    Cors,
}

/// What kind of resource the request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    #[default]
    Empty,
}

/// HTTP cache behaviour for an outgoing fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    /// Bypass intermediary caches.
    Reload,
}

/// A GET request seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
}

impl Request {
    pub fn new(url: Url, mode: RequestMode, destination: Destination) -> Self {
        Self { url, mode, destination }
    }

    /// A top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(url, RequestMode::Navigate, Destination::Document)
    }

    /// A plain `fetch(url)`.
    pub fn get(url: Url) -> Self {
        Self::new(url, RequestMode::Cors, Destination::Empty)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn wants_document(&self) -> bool {
        self.destination == Destination::Document
    }
}
