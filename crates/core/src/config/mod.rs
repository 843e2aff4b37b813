//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (AIDE_*)
//! 2. TOML config file (if AIDE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (AIDE_*)
/// 2. TOML config file (if AIDE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding cache generations.
    ///
    /// Set via AIDE_CACHE_DB_PATH environment variable.
    #[serde(default = "default_cache_db_path")]
    pub cache_db_path: PathBuf,

    /// Path to the SQLite key-value store for notes, drawing and usage records.
    ///
    /// Set via AIDE_STORAGE_PATH environment variable.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Key-value store quota in bytes (keys + values).
    ///
    /// Set via AIDE_STORAGE_QUOTA_BYTES environment variable.
    #[serde(default = "default_storage_quota_bytes")]
    pub storage_quota_bytes: usize,

    /// Cache generation name. Bump on every deployment that changes precached content.
    ///
    /// Set via AIDE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin and base path the precache manifest is resolved against.
    ///
    /// Set via AIDE_SCOPE_URL environment variable.
    #[serde(default = "default_scope_url")]
    pub scope_url: String,

    /// Application shell document served when navigations fail offline.
    ///
    /// Set via AIDE_SHELL_URL environment variable.
    #[serde(default = "default_shell_url")]
    pub shell_url: String,

    /// URLs fetched and stored at install time.
    ///
    /// Set via AIDE_PRECACHE_URLS environment variable (array syntax: `["./", "./index.html"]`).
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via AIDE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via AIDE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via AIDE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Scratchpad drawing surface width in pixels.
    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,

    /// Scratchpad drawing surface height in pixels.
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,

    /// Directory exported drawings are written to.
    ///
    /// Set via AIDE_EXPORT_DIR environment variable.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_cache_db_path() -> PathBuf {
    PathBuf::from("./aide-cache.sqlite")
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./aide-storage.sqlite")
}

fn default_storage_quota_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_cache_version() -> String {
    "a350-checklist-v1".into()
}

fn default_scope_url() -> String {
    "http://localhost:8080/".into()
}

fn default_shell_url() -> String {
    "./index.html".into()
}

fn default_precache_urls() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./manifest.json",
        "./service-worker.js",
        "./icons/apple-touch-icon.png",
        "./icons/A350XWB-192.png",
        "./icons/A350XWB-512.png",
        "./icons/A350XWB-carbon.svg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_user_agent() -> String {
    "aide-memoire/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_canvas_width() -> u32 {
    800
}

fn default_canvas_height() -> u32 {
    600
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_db_path: default_cache_db_path(),
            storage_path: default_storage_path(),
            storage_quota_bytes: default_storage_quota_bytes(),
            cache_version: default_cache_version(),
            scope_url: default_scope_url(),
            shell_url: default_shell_url(),
            precache_urls: default_precache_urls(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            export_dir: default_export_dir(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `AIDE_`
    /// 2. TOML file from `AIDE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("AIDE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("AIDE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
