//! User-visible alerts raised by failed saves.

use std::sync::{Mutex, PoisonError};

/// Sink for blocking user alerts.
pub trait Alerter: Send + Sync {
    fn alert(&self, message: &str);
}

/// Collects alerts until the host drains and shows them.
#[derive(Debug, Default)]
pub struct AlertQueue {
    pending: Mutex<Vec<String>>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued alert, oldest first.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Alerter for AlertQueue {
    fn alert(&self, message: &str) {
        tracing::warn!(%message, "alert raised");
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_queue() {
        let queue = AlertQueue::new();
        queue.alert("first");
        queue.alert("second");
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.drain(), vec!["first".to_string(), "second".to_string()]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }
}
