//! Registration records and the options used to create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigSchema;
use crate::lifecycle::PluginState;
use crate::sandbox::Capability;

/// Caller-supplied metadata for [`register`](crate::PluginRuntime::register).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginOptions {
    pub version: String,
    pub description: Option<String>,
    pub dependencies: Vec<String>,
    pub optional_dependencies: Vec<String>,
    pub permissions: Vec<Capability>,
    pub config_schema: Option<ConfigSchema>,
    pub auto_activate: bool,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            version: "0.0.0".to_string(),
            description: None,
            dependencies: Vec::new(),
            optional_dependencies: Vec::new(),
            permissions: Vec::new(),
            config_schema: None,
            auto_activate: false,
        }
    }
}

impl PluginOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.dependencies, name.into());
        self
    }

    pub fn dependencies(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for name in names {
            push_unique(&mut self.dependencies, name.into());
        }
        self
    }

    pub fn optional(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.optional_dependencies, name.into());
        self
    }

    pub fn permission(mut self, capability: Capability) -> Self {
        if !self.permissions.contains(&capability) {
            self.permissions.push(capability);
        }
        self
    }

    pub fn permissions(self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        capabilities.into_iter().fold(self, Self::permission)
    }

    pub fn config_schema(mut self, schema: ConfigSchema) -> Self {
        self.config_schema = Some(schema);
        self
    }

    pub fn auto_activate(mut self, auto_activate: bool) -> Self {
        self.auto_activate = auto_activate;
        self
    }
}

// Dependency lists are ordered sets.
fn push_unique(list: &mut Vec<String>, name: String) {
    if !list.contains(&name) {
        list.push(name);
    }
}

/// Registry record for one plugin. Snapshots of it are returned by
/// `get_plugin_info` and `get_all_plugins`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRegistration {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub dependencies: Vec<String>,
    pub optional_dependencies: Vec<String>,
    pub permissions: Vec<Capability>,
    pub config_schema: Option<ConfigSchema>,
    pub auto_activate: bool,
    pub state: PluginState,
    pub activated: bool,
    pub activation_count: u64,
    pub registered_at: DateTime<Utc>,
    pub last_activated_at: Option<DateTime<Utc>>,
    pub last_deactivated_at: Option<DateTime<Utc>>,
}

pub type PluginInfo = PluginRegistration;

impl PluginRegistration {
    pub fn new(name: impl Into<String>, options: PluginOptions) -> Self {
        Self {
            name: name.into(),
            version: options.version,
            description: options.description,
            dependencies: options.dependencies,
            optional_dependencies: options.optional_dependencies,
            permissions: options.permissions,
            config_schema: options.config_schema,
            auto_activate: options.auto_activate,
            state: PluginState::Registered,
            activated: false,
            activation_count: 0,
            registered_at: Utc::now(),
            last_activated_at: None,
            last_deactivated_at: None,
        }
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }
}

/// Result of a successful `register` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    /// A registration under the same name existed and was overwritten.
    Replaced { previous_version: String },
}

impl RegisterOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }
}
