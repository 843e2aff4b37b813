//! Unified error types for aide-memoire.
//!
//! Display strings carry a stable `CODE: detail` prefix that is also used
//! when errors are surfaced through MCP tool calls.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type shared by the cache controller and the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., malformed colour).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No cache entry found for the given URL.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Cache database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Key-value store operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Storage(String),

    /// A write would exceed the key-value store quota.
    #[error("QUOTA_EXCEEDED: writing {key} needs {needed} bytes, quota is {quota}")]
    QuotaExceeded { key: String, needed: usize, quota: usize },

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Network failure (offline, DNS, connection reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Precaching the manifest failed; nothing was written.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Operation not allowed in the controller's current lifecycle state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// Drawing raster could not be encoded or decoded.
    #[error("RASTER_ERROR: {0}")]
    Raster(String),
}

impl Error {
    /// Whether this error is a storage quota failure.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Error::QuotaExceeded { .. })
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::CacheMiss(_) => -32001,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::InvalidUrl(_) => -32003,
            Error::Network(_) => -32004,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::Storage(_) => -32013,
            Error::QuotaExceeded { .. } => -32014,
            Error::InstallFailed(_) => -32015,
            Error::InvalidState(_) => -32016,
            Error::Raster(_) => -32017,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("./index.html".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("./index.html"));
    }

    #[test]
    fn test_quota_display() {
        let err = Error::QuotaExceeded { key: "scratchpadNotes".into(), needed: 12, quota: 10 };
        assert!(err.is_quota_exceeded());
        assert_eq!(err.to_string(), "QUOTA_EXCEEDED: writing scratchpadNotes needs 12 bytes, quota is 10");
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let err = Error::QuotaExceeded { key: "k".into(), needed: 2, quota: 1 };
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32014);
        assert!(mcp_err.message.contains("QUOTA_EXCEEDED"));
    }
}
