//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Largest accepted drawing surface edge.
const MAX_CANVAS_EDGE: u32 = 8192;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_version` is empty
    /// - `scope_url` is not an absolute http(s) URL
    /// - `precache_urls` is empty or does not include `shell_url`
    /// - `storage_quota_bytes` is 0
    /// - the canvas is empty or larger than 8192 pixels on an edge
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.cache_version.trim().is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        match url::Url::parse(&self.scope_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("scope_url", "scheme must be http or https")),
            Err(e) => return Err(invalid("scope_url", &e.to_string())),
        }

        if self.precache_urls.is_empty() {
            return Err(invalid("precache_urls", "must list at least the application shell"));
        }
        if !self.precache_urls.iter().any(|u| u == &self.shell_url) {
            return Err(invalid("precache_urls", "must include shell_url"));
        }

        if self.storage_quota_bytes == 0 {
            return Err(invalid("storage_quota_bytes", "must be greater than 0"));
        }

        for (field, edge) in [("canvas_width", self.canvas_width), ("canvas_height", self.canvas_height)] {
            if edge == 0 || edge > MAX_CANVAS_EDGE {
                return Err(invalid(field, "must be between 1 and 8192"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(config: &AppConfig) -> Option<String> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_empty_cache_version() {
        let config = AppConfig { cache_version: "  ".into(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("cache_version"));
    }

    #[test]
    fn test_validate_scope_url_scheme() {
        let config = AppConfig { scope_url: "file:///srv/app/".into(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("scope_url"));

        let config = AppConfig { scope_url: "not a url".into(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("scope_url"));
    }

    #[test]
    fn test_validate_manifest_without_shell() {
        let config = AppConfig { precache_urls: vec!["./manifest.json".into()], ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("precache_urls"));

        let config = AppConfig { precache_urls: Vec::new(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("precache_urls"));
    }

    #[test]
    fn test_validate_zero_quota() {
        let config = AppConfig { storage_quota_bytes: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("storage_quota_bytes"));
    }

    #[test]
    fn test_validate_canvas_bounds() {
        let config = AppConfig { canvas_width: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("canvas_width"));

        let config = AppConfig { canvas_height: 8193, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("canvas_height"));

        let config = AppConfig { canvas_width: 8192, canvas_height: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
