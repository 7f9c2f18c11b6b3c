//! Per-activation context handed to `Plugin::activate`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::PluginApi;
use crate::observability::PluginLogger;
use crate::sandbox::Capability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Built fresh for every activation and discarded on deactivate.
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub id: ContextId,
    pub plugin_name: String,
    /// Effective configuration: provider section merged with the caller's object.
    pub config: Value,
    pub api: PluginApi,
    pub logger: PluginLogger,
    /// Capabilities granted for this activation.
    pub permissions: Vec<Capability>,
    pub created_at: DateTime<Utc>,
}

impl PluginContext {
    /// Dotted lookup into the configuration snapshot.
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        crate::config::validator::lookup(&self.config, key)
    }
}
