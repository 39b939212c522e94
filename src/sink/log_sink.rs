//! Echoes raw events as compact JSON lines.

use serde_json::Value;
use tracing::info;

/// Emits one `tracing` event per raw payload when enabled. Never discards or
/// transforms the payload; sinks observe, they don't filter.
pub struct LogSink {
    enabled: bool,
}

impl LogSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn handle(&self, raw: &Value) {
        if !self.enabled {
            return;
        }
        info!(event = %raw, "raw engine event");
    }
}
