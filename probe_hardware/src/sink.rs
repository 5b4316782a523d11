use std::sync::{Mutex, PoisonError};

use probe_traits::TriggerSink;

/// Trigger sink that remembers every reason code it was handed.
#[derive(Debug, Default)]
pub struct RecordingSink {
    hits: Mutex<Vec<u8>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> Vec<u8> {
        self.hits
            .lock()
            .map(|h| h.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn count(&self) -> usize {
        self.hits().len()
    }
}

impl TriggerSink for RecordingSink {
    fn notify(&self, reason: u8) {
        tracing::debug!(reason, "trigger sink notified");
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reason);
    }
}
