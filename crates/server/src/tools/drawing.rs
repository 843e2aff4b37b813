//! Scratchpad drawing tools.
//!
//! - `scratchpad_input`: feed pointer/touch events to the surface
//! - `scratchpad_color`: change the stroke colour
//! - `scratchpad_resize`: resize the surface and repaint the stored drawing
//! - `scratchpad_clear`: blank the surface and forget the stored drawing
//! - `scratchpad_export`: write the surface to a dated PNG file

use std::path::Path;
use std::sync::Arc;

use aide_core::scratchpad::{InputEvent, StrokeState, Viewport};
use aide_core::{AlertQueue, Error, Scratchpad};
use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::json_result;

const MAX_EDGE: u32 = 8192;

/// Parameters for the scratchpad_input tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScratchpadInputParams {
    /// Events in the order they occurred.
    pub events: Vec<InputEvent>,

    /// Displayed rectangle of the surface. When given, event coordinates
    /// are client coordinates and get scaled to surface pixels.
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

/// Output from the scratchpad_input tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScratchpadInputOutput {
    /// Some event requires default scrolling to be suppressed.
    pub prevent_default: bool,
    pub strokes_completed: usize,
    pub saves_failed: usize,
    /// A stroke is still in progress.
    pub drawing: bool,
    /// Alerts to show the user.
    pub alerts: Vec<String>,
}

/// Parameters for the scratchpad_color tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScratchpadColorParams {
    /// `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScratchpadColorOutput {
    pub color: String,
}

/// Parameters for the scratchpad_resize tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScratchpadResizeParams {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScratchpadResizeOutput {
    pub width: u32,
    pub height: u32,
    /// The stored drawing was repainted.
    pub restored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScratchpadClearOutput {
    pub cleared: bool,
}

/// Output from the scratchpad_export tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScratchpadExportOutput {
    pub file_name: String,
    pub path: String,
    pub bytes: usize,
}

/// Implementation of the scratchpad_input tool.
pub async fn input_impl(
    scratchpad: &Mutex<Scratchpad>, alerts: &Arc<AlertQueue>, params: ScratchpadInputParams,
) -> Result<CallToolResult, McpError> {
    let mut scratchpad = scratchpad.lock().await;
    let drawing = scratchpad.drawing_mut();

    let mut output = ScratchpadInputOutput {
        prevent_default: false,
        strokes_completed: 0,
        saves_failed: 0,
        drawing: false,
        alerts: Vec::new(),
    };

    for event in params.events {
        let outcome = match &params.viewport {
            Some(viewport) => drawing.handle_client(event, viewport),
            None => drawing.handle(event),
        };
        output.prevent_default |= outcome.prevent_default;
        match outcome.saved {
            Some(true) => output.strokes_completed += 1,
            Some(false) => {
                output.strokes_completed += 1;
                output.saves_failed += 1;
            }
            None => {}
        }
    }

    output.drawing = matches!(drawing.state(), StrokeState::Drawing { .. });
    output.alerts = alerts.drain();
    json_result(&output)
}

/// Implementation of the scratchpad_color tool.
pub async fn color_impl(scratchpad: &Mutex<Scratchpad>, params: ScratchpadColorParams) -> Result<CallToolResult, McpError> {
    let mut scratchpad = scratchpad.lock().await;
    scratchpad.drawing_mut().set_color(&params.color)?;
    json_result(&ScratchpadColorOutput { color: scratchpad.drawing().color().to_string() })
}

/// Implementation of the scratchpad_resize tool.
pub async fn resize_impl(
    scratchpad: &Mutex<Scratchpad>, params: ScratchpadResizeParams,
) -> Result<CallToolResult, McpError> {
    for (name, value) in [("width", params.width), ("height", params.height)] {
        if value == 0 || value > MAX_EDGE {
            return Err(Error::InvalidInput(format!("{name} must be between 1 and {MAX_EDGE}")).into());
        }
    }

    let pending = scratchpad.lock().await.drawing_mut().resize(params.width, params.height);

    // Decode without holding the session so notes and input stay responsive.
    let restored = match pending {
        Some(pending) => match pending.decode().await {
            Some(decoded) => scratchpad.lock().await.drawing_mut().paint(&decoded),
            None => false,
        },
        None => false,
    };
    json_result(&ScratchpadResizeOutput { width: params.width, height: params.height, restored })
}

/// Implementation of the scratchpad_clear tool.
pub async fn clear_impl(scratchpad: &Mutex<Scratchpad>) -> Result<CallToolResult, McpError> {
    scratchpad.lock().await.drawing_mut().clear()?;
    json_result(&ScratchpadClearOutput { cleared: true })
}

/// Implementation of the scratchpad_export tool.
pub async fn export_impl(scratchpad: &Mutex<Scratchpad>, export_dir: &Path) -> Result<CallToolResult, McpError> {
    let export = scratchpad.lock().await.drawing().export(Utc::now().date_naive())?;

    tokio::fs::create_dir_all(export_dir)
        .await
        .map_err(|e| Error::Storage(format!("failed to create {}: {e}", export_dir.display())))?;
    let path = export_dir.join(&export.file_name);
    tokio::fs::write(&path, &export.png)
        .await
        .map_err(|e| Error::Storage(format!("failed to write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), bytes = export.png.len(), "drawing exported");

    json_result(&ScratchpadExportOutput {
        file_name: export.file_name,
        path: path.display().to_string(),
        bytes: export.png.len(),
    })
}
