//! Observability: structured plugin logging, runtime metrics and spans.
//!
//! Nothing here installs a subscriber. Records flow through `tracing`, and the
//! host decides where they go.

mod logger;
mod metrics;
mod spans;

pub use logger::PluginLogger;
pub use metrics::{Counter, Gauge, Histogram, MetricsSummary, RuntimeMetrics};
pub use spans::SpanContext;
