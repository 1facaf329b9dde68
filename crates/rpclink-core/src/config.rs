//! Options shared by every connection type.

use std::sync::Arc;

use crate::logger::Logger;

/// Construction options for a connection.
#[derive(Clone, Default)]
pub struct ConnectionOptions {
    /// Receives `sending: ...` / `received: ...` lines. `None` disables wire logging.
    pub logger: Option<Arc<dyn Logger>>,
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger(self, logger: impl Logger + 'static) -> Self {
        self.with_shared_logger(Arc::new(logger))
    }

    pub fn with_shared_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Log an info line; the line is only built when a logger is present.
    pub fn log_info(&self, line: impl FnOnce() -> String) {
        if let Some(logger) = &self.logger {
            logger.info(&line());
        }
    }

    pub fn log_error(&self, line: &str, cause: &dyn std::error::Error) {
        if let Some(logger) = &self.logger {
            logger.error(line, cause);
        }
    }
}

impl std::fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("logger", &self.logger.is_some())
            .finish()
    }
}
