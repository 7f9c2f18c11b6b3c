//! Structured span definitions for runtime operations.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{Level, Span, field, span};

/// Creates correlated spans for one runtime instance.
#[derive(Debug)]
pub struct SpanContext {
    runtime_id: String,
    operation_id: AtomicU64,
}

impl SpanContext {
    pub fn new(runtime_id: impl Into<String>) -> Self {
        Self {
            runtime_id: runtime_id.into(),
            operation_id: AtomicU64::new(0),
        }
    }

    pub fn runtime_id(&self) -> &str {
        &self.runtime_id
    }

    pub fn next_operation_id(&self) -> u64 {
        self.operation_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn activate_span(&self, plugin: &str) -> Span {
        // Drawn outside `span!`: field expressions are skipped for disabled spans.
        let operation_id = self.next_operation_id();
        span!(
            Level::INFO,
            "plugin.activate",
            runtime_id = %self.runtime_id,
            operation_id,
            plugin = plugin,
            duration_ms = field::Empty,
        )
    }

    pub fn deactivate_span(&self, plugin: &str) -> Span {
        // Drawn outside `span!`: field expressions are skipped for disabled spans.
        let operation_id = self.next_operation_id();
        span!(
            Level::INFO,
            "plugin.deactivate",
            runtime_id = %self.runtime_id,
            operation_id,
            plugin = plugin,
        )
    }

    pub fn hook_span(&self, chain: &str, handlers: usize) -> Span {
        span!(
            Level::DEBUG,
            "hook.execute",
            runtime_id = %self.runtime_id,
            chain = chain,
            handlers = handlers,
            failures = field::Empty,
        )
    }

    pub fn publish_span(&self, topic: &str, subscribers: usize) -> Span {
        span!(
            Level::DEBUG,
            "bus.publish",
            runtime_id = %self.runtime_id,
            topic = topic,
            subscribers = subscribers,
            failures = field::Empty,
        )
    }
}

impl Default for SpanContext {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}
