//! Offline cache controller.
//!
//! Sits between the page and the network. Lifecycle:
//!
//! ```text
//! New --install ok--> Installed --activate--> Activated
//!  |  |                                 ^  ^
//!  |  +--install err--> InstallFailed --+  | (after a later successful install)
//!  +--restore (a live generation exists)---+
//! ```
//!
//! Activation marks its generation live in the cache database. A later run
//! restores that generation and serves it until its own install and
//! activation succeed, so a restart without network keeps working offline.
//!
//! ### Interception
//! - Non-http(s) schemes and anything before activation pass through.
//! - Requests are answered from the live generation, which may belong to
//!   an older version than the one configured.
//! - Navigations go to the network; on failure the cached shell is served.
//! - Sub-resources are cache-first. Misses go to the network and complete
//!   `200` basic/cors responses are stored in the background.

use std::sync::Arc;

use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use crate::fetch::{CacheMode, Network, Request, is_fetchable_scheme, parse_scope, resolve_fetchable};
use aide_core::{AppConfig, CacheDb, Error, GenerationInfo, Response};

/// Static controller settings, resolved against the scope.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Generation name for this deployment.
    pub version: String,
    pub scope: Url,
    /// Precache manifest, in order.
    pub precache: Vec<Url>,
    /// Document served when a navigation fails.
    pub shell: Url,
}

impl ControllerConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let scope = parse_scope(&config.scope_url)?;
        let precache = config
            .precache_urls
            .iter()
            .map(|u| resolve_fetchable(&scope, u))
            .collect::<Result<Vec<_>, _>>()?;
        let shell = resolve_fetchable(&scope, &config.shell_url)?;

        Ok(Self { version: config.cache_version.clone(), scope, precache, shell })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    New,
    InstallFailed,
    Installed,
    Activated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub generation: String,
    pub cached: usize,
    /// Eligible for immediate activation without waiting for old clients.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub generation: String,
    /// Superseded generations that were deleted.
    pub deleted: Vec<String>,
    pub claimed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub version: String,
    /// Generation requests are served from.
    pub live: Option<String>,
    pub lifecycle: Lifecycle,
    pub claimed: bool,
    pub generations: Vec<GenerationInfo>,
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Cached shell served for a failed document request.
    ShellFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the caller handles the request itself.
    Passthrough,
    Respond(Response, ResponseSource),
}

#[derive(Debug)]
struct State {
    lifecycle: Lifecycle,
    claimed: bool,
    live: Option<String>,
}

pub struct OfflineController {
    config: ControllerConfig,
    cache: CacheDb,
    network: Arc<dyn Network>,
    state: RwLock<State>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl OfflineController {
    pub fn new(config: ControllerConfig, cache: CacheDb, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            cache,
            network,
            state: RwLock::new(State { lifecycle: Lifecycle::New, claimed: false, live: None }),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        self.state.read().await.lifecycle
    }

    /// Precache the manifest into this version's generation.
    ///
    /// Every URL is fetched concurrently with the HTTP cache bypassed. If any
    /// fetch fails or is not 2xx nothing is written and the previously live
    /// generation, if any, stays live.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let version = self.config.version.clone();
        tracing::info!(version = %version, urls = self.config.precache.len(), "installing");

        let fetches = self.config.precache.iter().map(|url| async move {
            let response = self.network.fetch(&Request::get(url.clone()), CacheMode::Reload).await?;
            if !response.is_ok() {
                return Err(Error::InstallFailed(format!("{url} returned status {}", response.status)));
            }
            Ok::<_, Error>((url.to_string(), response))
        });

        let fetched = join_all(fetches).await.into_iter().collect::<Result<Vec<_>, Error>>();
        let written = match fetched {
            Ok(entries) => self.cache.put_entries(&version, entries).await,
            Err(e) => Err(e),
        };

        let mut state = self.state.write().await;
        match written {
            Ok(cached) => {
                if state.lifecycle != Lifecycle::Activated {
                    state.lifecycle = Lifecycle::Installed;
                }
                tracing::info!(version = %version, cached, "install complete");
                Ok(InstallReport { generation: version, cached, skip_waiting: true })
            }
            Err(e) => {
                if state.lifecycle != Lifecycle::Activated {
                    state.lifecycle = Lifecycle::InstallFailed;
                }
                tracing::error!(version = %version, "install failed: {e}");
                Err(match e {
                    Error::InstallFailed(_) => e,
                    other => Error::InstallFailed(other.to_string()),
                })
            }
        }
    }

    /// Resume serving the generation a previous run activated.
    ///
    /// Does nothing when this controller already serves a generation.
    /// Returns the generation being served.
    pub async fn restore(&self) -> Result<Option<String>, Error> {
        if let Some(live) = self.state.read().await.live.clone() {
            return Ok(Some(live));
        }

        let Some(live) = self.cache.live_generation().await? else {
            return Ok(None);
        };

        let mut state = self.state.write().await;
        if state.live.is_none() {
            tracing::info!(generation = %live, "restored live cache generation");
            state.lifecycle = Lifecycle::Activated;
            state.claimed = true;
            state.live = Some(live);
        }
        Ok(state.live.clone())
    }

    /// Make this version's generation the only one and take control.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let lifecycle = self.lifecycle().await;
        if !matches!(lifecycle, Lifecycle::Installed | Lifecycle::Activated) {
            return Err(Error::InvalidState(format!("cannot activate from {lifecycle:?}")));
        }
        if !self.cache.set_live_generation(&self.config.version).await? {
            return Err(Error::InvalidState(format!("generation {} is not installed", self.config.version)));
        }

        let mut deleted = Vec::new();
        for name in self.cache.generation_names().await? {
            if name != self.config.version && self.cache.delete_generation(&name).await? {
                tracing::info!(generation = %name, "deleted superseded cache generation");
                deleted.push(name);
            }
        }

        let mut state = self.state.write().await;
        state.lifecycle = Lifecycle::Activated;
        state.claimed = true;
        state.live = Some(self.config.version.clone());
        tracing::info!(version = %self.config.version, deleted = deleted.len(), "activated");

        Ok(ActivateReport { generation: self.config.version.clone(), deleted, claimed: true })
    }

    /// Restore the live generation, then install and activate this version.
    ///
    /// A failed install leaves a restored generation serving.
    pub async fn start(&self) -> Result<(InstallReport, ActivateReport), Error> {
        if let Err(e) = self.restore().await {
            tracing::warn!("could not restore live cache generation: {e}");
        }
        let install = self.install().await?;
        let activate = self.activate().await?;
        Ok((install, activate))
    }

    /// Answer one intercepted request.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if !is_fetchable_scheme(&request.url) {
            return Ok(FetchOutcome::Passthrough);
        }
        let Some(generation) = self.live_generation().await else {
            return Ok(FetchOutcome::Passthrough);
        };

        if request.is_navigation() {
            return match self.network.fetch(request, CacheMode::Default).await {
                Ok(response) => Ok(FetchOutcome::Respond(response, ResponseSource::Network)),
                Err(e) => self.shell_fallback(&generation, request, e).await,
            };
        }

        let key = request.url.as_str();
        match self.cache.match_entry(&generation, key).await {
            Ok(Some(cached)) => {
                tracing::debug!("cache hit for {}", key);
                return Ok(FetchOutcome::Respond(cached, ResponseSource::Cache));
            }
            Ok(None) => tracing::debug!("cache miss for {}", key),
            Err(e) => tracing::warn!("cache lookup failed for {}, treating as miss: {e}", key),
        }

        match self.network.fetch(request, CacheMode::Default).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_later(generation, key.to_string(), response.clone()).await;
                }
                Ok(FetchOutcome::Respond(response, ResponseSource::Network))
            }
            Err(e) if request.wants_document() => self.shell_fallback(&generation, request, e).await,
            Err(e) => Err(e),
        }
    }

    /// Generation to serve from; `None` until activated or restored.
    async fn live_generation(&self) -> Option<String> {
        let state = self.state.read().await;
        match state.lifecycle {
            Lifecycle::Activated => state.live.clone(),
            _ => None,
        }
    }

    async fn shell_fallback(&self, generation: &str, request: &Request, err: Error) -> Result<FetchOutcome, Error> {
        match self.cache.match_entry(generation, self.config.shell.as_str()).await {
            Ok(Some(shell)) => {
                tracing::info!("network failed for {}, serving cached shell: {err}", request.url);
                Ok(FetchOutcome::Respond(shell, ResponseSource::ShellFallback))
            }
            Ok(None) => Err(err),
            Err(lookup) => {
                tracing::warn!("shell lookup failed: {lookup}");
                Err(err)
            }
        }
    }

    async fn store_later(&self, generation: String, url: String, response: Response) {
        let cache = self.cache.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = cache.put_entry(&generation, &url, &response).await {
                tracing::warn!("failed to cache {}: {e}", url);
            }
        });

        let mut pending = self.pending.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every background cache write started so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().await);
        for result in join_all(handles).await {
            if let Err(e) = result {
                tracing::warn!("cache write task failed: {e}");
            }
        }
    }

    /// Settle pending writes, then report lifecycle and generations.
    pub async fn status(&self) -> Result<ControllerStatus, Error> {
        self.settle().await;
        let generations = self.cache.generations().await?;
        let state = self.state.read().await;
        Ok(ControllerStatus {
            version: self.config.version.clone(),
            live: state.live.clone(),
            lifecycle: state.lifecycle,
            claimed: state.claimed,
            generations,
        })
    }
}
