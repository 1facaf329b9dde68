//! Wire-level logging sink.
//!
//! Connections call the injected [`Logger`] with one human-readable line per
//! outbound send and per raw inbound message, before validation.

/// Sink for wire-level log lines.
pub trait Logger: Send + Sync {
    fn info(&self, line: &str);

    fn error(&self, line: &str, cause: &dyn std::error::Error);
}

/// [`Logger`] that forwards lines to `tracing`, tagged with a connection label.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    label: String,
}

impl TracingLogger {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("rpclink")
    }
}

impl Logger for TracingLogger {
    fn info(&self, line: &str) {
        tracing::info!(connection = %self.label, "{line}");
    }

    fn error(&self, line: &str, cause: &dyn std::error::Error) {
        tracing::error!(connection = %self.label, error = %cause, "{line}");
    }
}
