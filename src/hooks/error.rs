//! Per-handler failure records.

use serde::Serialize;
use serde_json::Value;

use super::HookId;

/// One handler failed (returned an error or panicked) during a chain run.
/// The chain continued with the last good payload.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("hook {hook_id} on chain '{chain}' failed: {reason}")]
pub struct HookExecutionError {
    pub chain: String,
    pub hook_id: HookId,
    pub owner: Option<String>,
    pub reason: String,
    pub panicked: bool,
}

/// Outcome of a chain execution.
#[derive(Debug, Clone)]
pub struct HookReport {
    pub payload: Value,
    /// Handlers actually run.
    pub invoked: usize,
    pub failures: Vec<HookExecutionError>,
}

impl HookReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
