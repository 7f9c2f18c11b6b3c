//! Structured logger handed to plugins.
//!
//! Every record carries the owning plugin name and the activation context id
//! as fields; formatting and transport belong to whatever `tracing`
//! subscriber the host installs.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::Level;

/// Logger handle bound to a single plugin.
#[derive(Clone)]
pub struct PluginLogger {
    plugin: Arc<str>,
    context_id: Option<Arc<str>>,
}

impl PluginLogger {
    pub fn new(plugin: impl Into<Arc<str>>) -> Self {
        Self {
            plugin: plugin.into(),
            context_id: None,
        }
    }

    pub fn with_context_id(mut self, context_id: impl fmt::Display) -> Self {
        self.context_id = Some(Arc::from(context_id.to_string()));
        self
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    /// Emit a record at `level` with arbitrary structured `fields`.
    pub fn log(&self, level: Level, message: &str, fields: &Value) {
        let plugin = &*self.plugin;
        let context_id = self.context_id.as_deref().unwrap_or("-");
        match level {
            Level::ERROR => {
                tracing::error!(target: "plugin", plugin, context_id, fields = %fields, "{message}")
            }
            Level::WARN => {
                tracing::warn!(target: "plugin", plugin, context_id, fields = %fields, "{message}")
            }
            Level::INFO => {
                tracing::info!(target: "plugin", plugin, context_id, fields = %fields, "{message}")
            }
            Level::DEBUG => {
                tracing::debug!(target: "plugin", plugin, context_id, fields = %fields, "{message}")
            }
            _ => {
                tracing::trace!(target: "plugin", plugin, context_id, fields = %fields, "{message}")
            }
        }
    }

    pub fn error(&self, message: &str) {
        self.log(Level::ERROR, message, &Value::Null);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::WARN, message, &Value::Null);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::INFO, message, &Value::Null);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message, &Value::Null);
    }
}

impl fmt::Debug for PluginLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLogger")
            .field("plugin", &self.plugin)
            .field("context_id", &self.context_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_logger_identity() {
        let logger = PluginLogger::new("metrics").with_context_id("ctx-1");
        assert_eq!(logger.plugin(), "metrics");
        assert_eq!(logger.context_id(), Some("ctx-1"));
    }

    #[test]
    fn test_logger_emits_without_subscriber() {
        let logger = PluginLogger::new("audit");
        logger.info("started");
        logger.log(Level::WARN, "slow", &json!({"elapsed_ms": 120}));
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_records_carry_plugin_and_context() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            PluginLogger::new("audit")
                .with_context_id("ctx-9")
                .log(Level::WARN, "queue backed up", &json!({"depth": 42}));
        });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("queue backed up"));
        assert!(output.contains("audit"));
        assert!(output.contains("ctx-9"));
        assert!(output.contains("depth"));
    }
}
