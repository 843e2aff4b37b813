//! Offline cache tools.
//!
//! - `cache_status`: lifecycle state and live generations
//! - `cache_refresh`: re-run install and activation

use aide_client::{ActivateReport, InstallReport, Lifecycle, OfflineController};
use aide_core::GenerationInfo;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    /// Generation name this server precaches into.
    pub version: String,
    /// Generation requests are served from, possibly an older version.
    pub live: Option<String>,
    pub lifecycle: Lifecycle,
    pub claimed: bool,
    pub generations: Vec<GenerationInfo>,
}

/// Output from the cache_refresh tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheRefreshOutput {
    pub generation: String,
    /// Number of manifest entries written.
    pub cached: usize,
    pub skip_waiting: bool,
    /// Superseded generations deleted on activation.
    pub deleted: Vec<String>,
    pub claimed: bool,
}

impl From<(InstallReport, ActivateReport)> for CacheRefreshOutput {
    fn from((install, activate): (InstallReport, ActivateReport)) -> Self {
        Self {
            generation: install.generation,
            cached: install.cached,
            skip_waiting: install.skip_waiting,
            deleted: activate.deleted,
            claimed: activate.claimed,
        }
    }
}

/// Implementation of the cache_status tool.
pub async fn status_impl(controller: &OfflineController) -> Result<CallToolResult, McpError> {
    let status = controller.status().await?;
    json_result(&CacheStatusOutput {
        version: status.version,
        live: status.live,
        lifecycle: status.lifecycle,
        claimed: status.claimed,
        generations: status.generations,
    })
}

/// Implementation of the cache_refresh tool.
pub async fn refresh_impl(controller: &OfflineController) -> Result<CallToolResult, McpError> {
    let reports = controller.start().await?;
    json_result(&CacheRefreshOutput::from(reports))
}
