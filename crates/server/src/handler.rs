//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::path::PathBuf;
use std::sync::Arc;

use aide_client::OfflineController;
use aide_core::{AlertQueue, Scratchpad, UsageTracker};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tokio::sync::Mutex;

use crate::tools::assets::AssetFetchParams;
use crate::tools::drawing::{ScratchpadColorParams, ScratchpadInputParams, ScratchpadResizeParams};
use crate::tools::notes::NotesSaveParams;
use crate::tools::usage::UsageResetParams;
use crate::tools::{assets, cache, drawing, notes, usage};

/// Everything one page instance owns.
pub struct PageState {
    pub controller: Arc<OfflineController>,
    pub usage: UsageTracker,
    pub scratchpad: Mutex<Scratchpad>,
    pub alerts: Arc<AlertQueue>,
    pub export_dir: PathBuf,
}

/// The main MCP server handler for aide-memoire.
#[derive(Clone)]
pub struct AideServer {
    tool_router: ToolRouter<Self>,
    state: Arc<PageState>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl AideServer {
    /// Create a new server handler.
    pub fn new(state: PageState) -> Self {
        Self { tool_router: Self::tool_router(), state: Arc::new(state) }
    }

    #[tool(description = "Request a URL through the offline cache controller. Relative URLs resolve against the app scope. Reports whether the response came from the cache, the network or the offline shell fallback.")]
    async fn asset_fetch(&self, params: Parameters<AssetFetchParams>) -> Result<CallToolResult, McpError> {
        assets::fetch_impl(&self.state.controller, params.0).await
    }

    #[tool(description = "Show the offline cache lifecycle state and the cache generations with their entry counts.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        cache::status_impl(&self.state.controller).await
    }

    #[tool(description = "Re-run precaching and activation for the current cache version. Deletes superseded generations.")]
    async fn cache_refresh(&self) -> Result<CallToolResult, McpError> {
        cache::refresh_impl(&self.state.controller).await
    }

    #[tool(description = "Anonymous usage statistics: unique users, total visits, average visits per user, users active in the last 30 days.")]
    async fn usage_stats(&self) -> Result<CallToolResult, McpError> {
        usage::stats_impl(&self.state.usage).await
    }

    #[tool(description = "Discard all usage records. Requires confirm=true.")]
    async fn usage_reset(&self, params: Parameters<UsageResetParams>) -> Result<CallToolResult, McpError> {
        usage::reset_impl(&self.state.usage, params.0).await
    }

    #[tool(description = "Read the scratchpad notes.")]
    async fn notes_get(&self) -> Result<CallToolResult, McpError> {
        notes::get_impl(&self.state.scratchpad).await
    }

    #[tool(description = "Replace the scratchpad notes with the given text. Reports any storage alerts.")]
    async fn notes_save(&self, params: Parameters<NotesSaveParams>) -> Result<CallToolResult, McpError> {
        notes::save_impl(&self.state.scratchpad, &self.state.alerts, params.0).await
    }

    #[tool(description = "Feed mouse or touch events to the scratchpad drawing surface. A completed stroke is saved automatically.")]
    async fn scratchpad_input(&self, params: Parameters<ScratchpadInputParams>) -> Result<CallToolResult, McpError> {
        drawing::input_impl(&self.state.scratchpad, &self.state.alerts, params.0).await
    }

    #[tool(description = "Set the stroke colour (#rgb, #rrggbb or #rrggbbaa).")]
    async fn scratchpad_color(&self, params: Parameters<ScratchpadColorParams>) -> Result<CallToolResult, McpError> {
        drawing::color_impl(&self.state.scratchpad, params.0).await
    }

    #[tool(description = "Resize the drawing surface. The stored drawing is repainted at the top-left corner.")]
    async fn scratchpad_resize(&self, params: Parameters<ScratchpadResizeParams>) -> Result<CallToolResult, McpError> {
        drawing::resize_impl(&self.state.scratchpad, params.0).await
    }

    #[tool(description = "Clear the drawing surface and delete the stored drawing.")]
    async fn scratchpad_clear(&self) -> Result<CallToolResult, McpError> {
        drawing::clear_impl(&self.state.scratchpad).await
    }

    #[tool(description = "Export the drawing as scratchpad-YYYY-MM-DD.png in the export directory.")]
    async fn scratchpad_export(&self) -> Result<CallToolResult, McpError> {
        drawing::export_impl(&self.state.scratchpad, &self.state.export_dir).await
    }
}

impl ServerHandler for AideServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "aide-memoire".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aide_client::{CacheMode, ControllerConfig, Network, Request};
    use aide_core::{AppConfig, CacheDb, Error, Response, SharedStore, SqliteStore};
    use async_trait::async_trait;

    struct OfflineNetwork;

    #[async_trait]
    impl Network for OfflineNetwork {
        async fn fetch(&self, _request: &Request, _cache: CacheMode) -> Result<Response, Error> {
            Err(Error::Network("offline".into()))
        }
    }

    async fn server() -> AideServer {
        let config = ControllerConfig::from_app(&AppConfig::default()).unwrap();
        let cache = CacheDb::open_in_memory().await.unwrap();
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory(1024 * 1024).unwrap());
        let alerts = Arc::new(AlertQueue::new());

        AideServer::new(PageState {
            controller: Arc::new(OfflineController::new(config, cache, Arc::new(OfflineNetwork))),
            usage: UsageTracker::new(store.clone()),
            scratchpad: Mutex::new(Scratchpad::new(store, alerts.clone(), 64, 64)),
            alerts,
            export_dir: std::env::temp_dir(),
        })
    }

    #[tokio::test]
    async fn test_all_tools_registered() {
        let server = server().await;
        let names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        for expected in [
            "asset_fetch",
            "cache_status",
            "cache_refresh",
            "usage_stats",
            "usage_reset",
            "notes_get",
            "notes_save",
            "scratchpad_input",
            "scratchpad_color",
            "scratchpad_resize",
            "scratchpad_clear",
            "scratchpad_export",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing tool {expected}");
        }
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = server().await;
        assert_eq!(server.get_info().server_info.name, "aide-memoire");
    }

    #[tokio::test]
    async fn test_refresh_offline_reports_install_failure() {
        let server = server().await;
        let err = server.cache_refresh().await.unwrap_err();
        assert_eq!(err.code.0, -32015);
    }
}
