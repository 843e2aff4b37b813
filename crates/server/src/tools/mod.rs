//! MCP tool implementations.
//!
//! This module contains all tools exposed by the aide-memoire server.

pub mod assets;
pub mod cache;
pub mod drawing;
pub mod notes;
pub mod usage;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use aide_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
    let text = result.content.first().and_then(|c| c.as_text()).map(|c| c.text.clone()).unwrap_or_default();
    serde_json::from_str(&text).unwrap()
}
