//! Diagnostics sink for inbound request payloads.

use serde_json::Value;

/// Records the `request` part of each served event. Must not block or fail.
pub trait RequestSink: Send + Sync {
    fn record(&self, request: &Value);
}

/// Writes each request to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl RequestSink for LogSink {
    fn record(&self, request: &Value) {
        log::info!(target: "askrelay::request", "{}", request);
    }
}
