//! Free-text scratchpad notes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::alert::Alerter;
use crate::storage::{SharedStore, keys};

pub const NOTES_FULL_ALERT: &str = "Could not save notes - storage space full";

/// Notes document persisted verbatim on every edit.
pub struct Notes {
    store: SharedStore,
    alerts: Arc<dyn Alerter>,
    alert_shown: AtomicBool,
}

impl Notes {
    pub fn new(store: SharedStore, alerts: Arc<dyn Alerter>) -> Self {
        Self { store, alerts, alert_shown: AtomicBool::new(false) }
    }

    /// Stored text, or an empty string when nothing was saved.
    pub fn load(&self) -> String {
        match self.store.get(keys::NOTES) {
            Ok(text) => text.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("failed to read notes: {e}");
                String::new()
            }
        }
    }

    /// Persist `text`. Returns whether the write succeeded.
    ///
    /// The user is alerted about a failed save at most once per session.
    pub fn save(&self, text: &str) -> bool {
        match self.store.set(keys::NOTES, text) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(bytes = text.len(), "failed to save notes: {e}");
                if !self.alert_shown.swap(true, Ordering::SeqCst) {
                    self.alerts.alert(NOTES_FULL_ALERT);
                }
                false
            }
        }
    }
}
