//! asset_fetch tool implementation.
//!
//! Issues a request through the offline controller, as the page would.

use aide_client::{
    CacheMode, Destination, FetchOutcome, Network, OfflineController, Request, RequestMode, ResponseSource,
};
use aide_client::fetch::{is_fetchable_scheme, resolve};
use aide_core::{Error, Response, ResponseType};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the asset_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetFetchParams {
    /// URL to request, absolute or relative to the app scope.
    pub url: String,

    /// Request mode (default: "cors"). Use "navigate" for page loads.
    #[serde(default)]
    pub mode: RequestMode,

    /// Resource kind. Defaults to "document" for navigations.
    #[serde(default)]
    pub destination: Option<Destination>,
}

/// Output from the asset_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetFetchOutput {
    /// Resolved request URL.
    pub url: String,
    /// "cache", "network", "shell_fallback" or "passthrough".
    pub source: String,
    /// HTTP status; absent when the request was not fetched.
    pub status: Option<u16>,
    pub response_type: Option<ResponseType>,
    pub content_type: Option<String>,
    /// Body length in bytes.
    pub bytes: usize,
    /// Body as text when it is valid UTF-8.
    pub text: Option<String>,
    /// Body as base64 otherwise.
    pub body_base64: Option<String>,
}

impl AssetFetchOutput {
    fn unfetched(url: &str) -> Self {
        Self {
            url: url.to_string(),
            source: "passthrough".into(),
            status: None,
            response_type: None,
            content_type: None,
            bytes: 0,
            text: None,
            body_base64: None,
        }
    }

    fn from_response(url: &str, source: &str, response: &Response) -> Self {
        let (text, body_base64) = match std::str::from_utf8(&response.body) {
            Ok(text) => (Some(text.to_string()), None),
            Err(_) => (None, Some(STANDARD.encode(&response.body))),
        };

        Self {
            url: url.to_string(),
            source: source.to_string(),
            status: Some(response.status),
            response_type: Some(response.response_type),
            content_type: response.content_type().map(str::to_string),
            bytes: response.body.len(),
            text,
            body_base64,
        }
    }
}

fn source_name(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Cache => "cache",
        ResponseSource::Network => "network",
        ResponseSource::ShellFallback => "shell_fallback",
    }
}

/// Implementation of the asset_fetch tool.
pub async fn fetch_impl(controller: &OfflineController, params: AssetFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(&controller.config().scope, &params.url).map_err(Error::from)?;
    let destination = params.destination.unwrap_or(if params.mode == RequestMode::Navigate {
        Destination::Document
    } else {
        Destination::Empty
    });
    let request = Request::new(url, params.mode, destination);

    let output = match controller.handle_fetch(&request).await? {
        FetchOutcome::Respond(response, source) => {
            AssetFetchOutput::from_response(request.url.as_str(), source_name(source), &response)
        }
        FetchOutcome::Passthrough if is_fetchable_scheme(&request.url) => {
            let response = controller.network().fetch(&request, CacheMode::Default).await?;
            AssetFetchOutput::from_response(request.url.as_str(), "passthrough", &response)
        }
        FetchOutcome::Passthrough => AssetFetchOutput::unfetched(request.url.as_str()),
    };

    json_result(&output)
}
