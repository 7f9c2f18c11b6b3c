//! Outcomes of whole-runtime operations.

use crate::plugins::PluginError;

/// Result of [`PluginRuntime::start`](super::PluginRuntime::start).
#[derive(Debug, Default)]
pub struct StartReport {
    pub activated: Vec<String>,
    pub failed: Vec<PluginError>,
}

impl StartReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of [`PluginRuntime::shutdown`](super::PluginRuntime::shutdown).
///
/// Failures are `PluginError::Shutdown`. Each failing plugin was still
/// cleaned up and marked inactive.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Plugins that deactivated cleanly, in the order it happened.
    pub deactivated: Vec<String>,
    pub failures: Vec<PluginError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
