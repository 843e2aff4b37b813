//! aide-memoire server entry point.
//!
//! Boots one page instance (offline cache controller, usage tracking,
//! scratchpad) and serves it as an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use aide_client::{ControllerConfig, FetchConfig, HttpNetwork, OfflineController};
use aide_core::{AlertQueue, AppConfig, CacheDb, Scratchpad, SharedStore, SqliteStore, UsageTracker};
use anyhow::Result;
use chrono::Utc;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

use handler::{AideServer, PageState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.cache_version, scope = %config.scope_url, "Starting aide-memoire server on stdio transport");

    let cache = CacheDb::open(&config.cache_db_path).await?;
    let controller_config = ControllerConfig::from_app(&config)?;
    let network = HttpNetwork::new(FetchConfig::from_app(&config), controller_config.scope.clone())?;
    let controller = Arc::new(OfflineController::new(controller_config, cache, Arc::new(network)));

    if let Err(e) = controller.start().await {
        match controller.restore().await {
            Ok(Some(live)) => tracing::warn!(generation = %live, "install failed, serving previous cache generation: {e}"),
            _ => tracing::warn!("offline cache not active, requests go straight to the network: {e}"),
        }
    }

    let store: SharedStore = Arc::new(SqliteStore::open(&config.storage_path, config.storage_quota_bytes)?);
    let usage = UsageTracker::new(store.clone());
    usage.track_visit(Utc::now());

    let alerts = Arc::new(AlertQueue::new());
    let mut scratchpad = Scratchpad::new(store, alerts.clone(), config.canvas_width, config.canvas_height);
    scratchpad.load().await;

    let handler = AideServer::new(PageState {
        controller,
        usage,
        scratchpad: Mutex::new(scratchpad),
        alerts,
        export_dir: config.export_dir,
    });

    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
