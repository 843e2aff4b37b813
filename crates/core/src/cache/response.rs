//! Captured HTTP responses as stored in and served from the cache.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How much of a response the page is allowed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response, fully readable.
    Basic,
    /// Cross-origin response obtained in CORS mode.
    Cors,
    /// Cross-origin no-cors response; status and body are hidden.
    Opaque,
    /// Network error placeholder.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }

    /// Parse a stored response type; unknown values read back as `Error`.
    pub fn parse(value: &str) -> Self {
        match value {
            "basic" => ResponseType::Basic,
            "cors" => ResponseType::Cors,
            "opaque" => ResponseType::Opaque,
            _ => ResponseType::Error,
        }
    }
}

/// A captured response.
///
/// `body` is reference counted: cloning a response duplicates it without
/// copying the bytes, so one copy can go to the cache while the original is
/// returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    /// Build an opaque response: status 0, no headers, empty body.
    pub fn opaque(url: impl Into<String>) -> Self {
        Self { url: url.into(), status: 0, response_type: ResponseType::Opaque, headers: Vec::new(), body: Bytes::new() }
    }

    /// Whether the response may be written to a cache generation.
    ///
    /// Only complete, readable `200` responses qualify.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && matches!(self.response_type, ResponseType::Basic | ResponseType::Cors)
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
