//! Scratchpad notes tools.

use std::sync::Arc;

use aide_core::{AlertQueue, Scratchpad};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::json_result;

/// Output from the notes_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotesGetOutput {
    pub text: String,
}

/// Parameters for the notes_save tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotesSaveParams {
    /// Full notes text; replaces what was stored.
    pub text: String,
}

/// Output from the notes_save tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotesSaveOutput {
    pub saved: bool,
    /// Alerts to show the user.
    pub alerts: Vec<String>,
}

/// Implementation of the notes_get tool.
pub async fn get_impl(scratchpad: &Mutex<Scratchpad>) -> Result<CallToolResult, McpError> {
    let text = scratchpad.lock().await.notes().load();
    json_result(&NotesGetOutput { text })
}

/// Implementation of the notes_save tool.
pub async fn save_impl(
    scratchpad: &Mutex<Scratchpad>, alerts: &Arc<AlertQueue>, params: NotesSaveParams,
) -> Result<CallToolResult, McpError> {
    let saved = scratchpad.lock().await.notes().save(&params.text);
    json_result(&NotesSaveOutput { saved, alerts: alerts.drain() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::output_json;
    use aide_core::{SharedStore, SqliteStore};

    fn session(quota: usize) -> (Mutex<Scratchpad>, Arc<AlertQueue>) {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory(quota).unwrap());
        let alerts = Arc::new(AlertQueue::new());
        (Mutex::new(Scratchpad::new(store, alerts.clone(), 16, 16)), alerts)
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let (scratchpad, alerts) = session(4096);
        let params = NotesSaveParams { text: "CRZ FL370\nCI 80".into() };
        let output = output_json(&save_impl(&scratchpad, &alerts, params).await.unwrap());
        assert_eq!(output["saved"], true);

        let output = output_json(&get_impl(&scratchpad).await.unwrap());
        assert_eq!(output["text"], "CRZ FL370\nCI 80");
    }

    #[tokio::test]
    async fn test_quota_alert_reported_once() {
        let (scratchpad, alerts) = session(24);
        let big = NotesSaveParams { text: "x".repeat(100) };

        let first = output_json(&save_impl(&scratchpad, &alerts, big.clone()).await.unwrap());
        assert_eq!(first["saved"], false);
        assert_eq!(first["alerts"].as_array().unwrap().len(), 1);

        let second = output_json(&save_impl(&scratchpad, &alerts, big).await.unwrap());
        assert_eq!(second["saved"], false);
        assert!(second["alerts"].as_array().unwrap().is_empty());
    }
}
