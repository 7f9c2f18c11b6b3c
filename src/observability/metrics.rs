//! Runtime metrics.
//!
//! Lock-free atomic counters updated by the lifecycle controller, the hook
//! engine and the message bus. A `MetricsSummary` gives a point-in-time view.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Thread-safe atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe atomic gauge.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket histogram.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    bounds: Vec<f64>,
    // Sum is stored in micro-units to keep sub-millisecond precision.
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(bounds: Vec<f64>) -> Self {
        let buckets = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            bounds,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn default_latency() -> Self {
        Self::new(vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0])
    }

    pub fn observe(&self, value: f64) {
        let idx = self
            .bounds
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(self.bounds.len());

        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((value.max(0.0) * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }

    pub fn sum_ms(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn mean_ms(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum_ms() / n as f64,
        }
    }
}

/// Counters shared by every runtime component.
///
/// When constructed with `enabled = false` every `record_*` call is a no-op,
/// so components can hold a metrics handle unconditionally.
#[derive(Debug)]
pub struct RuntimeMetrics {
    enabled: AtomicBool,
    pub activations: Counter,
    pub activation_failures: Counter,
    pub deactivations: Counter,
    pub deactivation_failures: Counter,
    pub active_plugins: Gauge,
    pub activation_latency_ms: Histogram,
    pub hook_invocations: Counter,
    pub hook_failures: Counter,
    pub messages_published: Counter,
    pub deliveries: Counter,
    pub delivery_failures: Counter,
}

impl RuntimeMetrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            activations: Counter::new(),
            activation_failures: Counter::new(),
            deactivations: Counter::new(),
            deactivation_failures: Counter::new(),
            active_plugins: Gauge::new(),
            activation_latency_ms: Histogram::default_latency(),
            hook_invocations: Counter::new(),
            hook_failures: Counter::new(),
            messages_published: Counter::new(),
            deliveries: Counter::new(),
            delivery_failures: Counter::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn record_activation(&self, success: bool, latency_ms: f64) {
        if !self.is_enabled() {
            return;
        }
        self.activation_latency_ms.observe(latency_ms);
        if success {
            self.activations.inc();
            self.active_plugins.inc();
        } else {
            self.activation_failures.inc();
        }
    }

    pub fn record_deactivation(&self, success: bool) {
        if !self.is_enabled() {
            return;
        }
        // The plugin leaves the active set even when its own cleanup failed.
        self.active_plugins.dec();
        if success {
            self.deactivations.inc();
        } else {
            self.deactivation_failures.inc();
        }
    }

    pub fn record_hook(&self, invoked: u64, failed: u64) {
        if !self.is_enabled() {
            return;
        }
        self.hook_invocations.add(invoked);
        self.hook_failures.add(failed);
    }

    pub fn record_publish(&self, delivered: u64, failed: u64) {
        if !self.is_enabled() {
            return;
        }
        self.messages_published.inc();
        self.deliveries.add(delivered);
        self.delivery_failures.add(failed);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary::from_metrics(self)
    }
}

impl Default for RuntimeMetrics {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Point-in-time snapshot of [`RuntimeMetrics`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct MetricsSummary {
    pub activations: u64,
    pub activation_failures: u64,
    pub deactivations: u64,
    pub deactivation_failures: u64,
    pub active_plugins: i64,
    pub avg_activation_ms: f64,
    pub hook_invocations: u64,
    pub hook_failures: u64,
    pub messages_published: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
}

impl MetricsSummary {
    pub fn from_metrics(metrics: &RuntimeMetrics) -> Self {
        Self {
            activations: metrics.activations.get(),
            activation_failures: metrics.activation_failures.get(),
            deactivations: metrics.deactivations.get(),
            deactivation_failures: metrics.deactivation_failures.get(),
            active_plugins: metrics.active_plugins.get(),
            avg_activation_ms: metrics.activation_latency_ms.mean_ms(),
            hook_invocations: metrics.hook_invocations.get(),
            hook_failures: metrics.hook_failures.get(),
            messages_published: metrics.messages_published.get(),
            deliveries: metrics.deliveries.get(),
            delivery_failures: metrics.delivery_failures.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        counter.inc();
        counter.add(4);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_gauge_goes_negative() {
        let gauge = Gauge::new();
        gauge.inc();
        gauge.dec();
        gauge.dec();
        assert_eq!(gauge.get(), -1);
    }

    #[test]
    fn test_histogram_buckets() {
        let hist = Histogram::new(vec![10.0, 100.0]);
        hist.observe(5.0);
        hist.observe(50.0);
        hist.observe(500.0);
        assert_eq!(hist.count(), 3);
        assert_eq!(hist.bucket_counts(), vec![1, 1, 1]);
        assert!((hist.sum_ms() - 555.0).abs() < 0.01);
    }

    #[test]
    fn test_runtime_metrics_summary() {
        let metrics = RuntimeMetrics::default();
        metrics.record_activation(true, 4.0);
        metrics.record_activation(false, 2.0);
        metrics.record_hook(3, 1);
        metrics.record_publish(2, 1);

        let summary = metrics.summary();
        assert_eq!(summary.activations, 1);
        assert_eq!(summary.activation_failures, 1);
        assert_eq!(summary.active_plugins, 1);
        assert_eq!(summary.hook_invocations, 3);
        assert_eq!(summary.hook_failures, 1);
        assert_eq!(summary.messages_published, 1);
        assert_eq!(summary.deliveries, 2);
        assert_eq!(summary.delivery_failures, 1);
    }

    #[test]
    fn test_disabled_metrics_ignore_records() {
        let metrics = RuntimeMetrics::disabled();
        metrics.record_activation(true, 1.0);
        metrics.record_publish(5, 0);
        assert_eq!(metrics.summary(), MetricsSummary::default());
    }
}
