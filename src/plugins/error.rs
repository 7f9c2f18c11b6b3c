//! Errors raised by registration, dependency resolution and the lifecycle.

use crate::sandbox::Capability;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Invalid plugin '{name}': {reason}")]
    InvalidPlugin { name: String, reason: String },

    #[error("Plugin '{name}' is not registered")]
    NotRegistered { name: String },

    #[error("Plugin '{plugin}' is missing required dependencies: {}", .missing.join(", "))]
    MissingDependencies { plugin: String, missing: Vec<String> },

    #[error("Plugin '{plugin}' could not activate dependency '{dependency}': {source}")]
    DependencyActivation {
        plugin: String,
        dependency: String,
        #[source]
        source: Box<PluginError>,
    },

    #[error("Cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Invalid configuration for plugin '{plugin}': {reason}")]
    InvalidConfig { plugin: String, reason: String },

    #[error("Plugin '{plugin}' failed to activate: {reason}")]
    Activation { plugin: String, reason: String },

    #[error("Plugin '{plugin}' failed to deactivate: {reason}")]
    Deactivation { plugin: String, reason: String },

    #[error("Plugin '{plugin}' failed during shutdown: {reason}")]
    Shutdown { plugin: String, reason: String },

    #[error("Plugin '{plugin}' lacks the {capability} capability")]
    PermissionDenied {
        plugin: String,
        capability: Capability,
    },
}

impl PluginError {
    /// Name of the plugin the error is about, when there is exactly one.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::InvalidPlugin { name, .. } | Self::NotRegistered { name } => Some(name),
            Self::MissingDependencies { plugin, .. }
            | Self::DependencyActivation { plugin, .. }
            | Self::InvalidConfig { plugin, .. }
            | Self::Activation { plugin, .. }
            | Self::Deactivation { plugin, .. }
            | Self::Shutdown { plugin, .. }
            | Self::PermissionDenied { plugin, .. } => Some(plugin),
            Self::CyclicDependency { .. } => None,
        }
    }

    /// Innermost error of a chain of dependency activation failures.
    pub fn root_cause(&self) -> &PluginError {
        match self {
            Self::DependencyActivation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
