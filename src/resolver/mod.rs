//! Dependency resolver.
//!
//! Checks a plugin's required and optional dependencies against the registry,
//! rejects cycles up front, and asks a [`DependencyActivator`] (the lifecycle
//! controller) to activate inactive required dependencies depth-first.

mod graph;

pub use graph::{DependencyGraph, find_cycle, topological_order};

use futures::future::BoxFuture;

use crate::lifecycle::PluginState;
use crate::plugins::{PluginError, PluginRegistry};

/// Activates a dependency on the resolver's behalf.
pub trait DependencyActivator: Send + Sync {
    fn activate_dependency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), PluginError>>;
}

/// What `check_dependencies` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    /// Required dependencies that were inactive and got activated, in order.
    pub activated: Vec<String>,
    /// Optional dependencies that are not registered.
    pub missing_optional: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a> {
    registry: &'a PluginRegistry,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a PluginRegistry) -> Self {
        Self { registry }
    }

    pub fn missing_required(&self, name: &str) -> Result<Vec<String>, PluginError> {
        let info = self.info(name)?;
        Ok(self.unregistered(&info.dependencies))
    }

    pub fn missing_optional(&self, name: &str) -> Result<Vec<String>, PluginError> {
        let info = self.info(name)?;
        Ok(self.unregistered(&info.optional_dependencies))
    }

    pub fn detect_cycle(&self, name: &str) -> Option<Vec<String>> {
        find_cycle(&self.registry.dependency_graph(), name)
    }

    /// Make every required dependency of `name` active.
    ///
    /// Fails with `MissingDependencies` naming every unregistered required
    /// dependency, with `CyclicDependency` if `name` reaches a cycle, or with
    /// `DependencyActivation` wrapping the first nested failure. Optional
    /// dependencies are never activated here; unregistered ones are only
    /// logged.
    pub async fn check_dependencies(
        &self,
        name: &str,
        activator: &dyn DependencyActivator,
    ) -> Result<DependencyReport, PluginError> {
        let info = self.info(name)?;

        let missing = self.unregistered(&info.dependencies);
        if !missing.is_empty() {
            return Err(PluginError::MissingDependencies {
                plugin: name.to_string(),
                missing,
            });
        }

        if let Some(cycle) = self.detect_cycle(name) {
            return Err(PluginError::CyclicDependency { cycle });
        }

        let missing_optional = self.unregistered(&info.optional_dependencies);
        if !missing_optional.is_empty() {
            tracing::warn!(
                plugin = %name,
                missing = %missing_optional.join(", "),
                "Optional dependencies are not registered"
            );
        }

        let mut activated = Vec::new();
        for dependency in &info.dependencies {
            if self.registry.state(dependency) == Some(PluginState::Activated) {
                continue;
            }
            tracing::debug!(plugin = %name, dependency = %dependency, "Activating dependency");
            activator
                .activate_dependency(dependency)
                .await
                .map_err(|e| PluginError::DependencyActivation {
                    plugin: name.to_string(),
                    dependency: dependency.clone(),
                    source: Box::new(e),
                })?;
            activated.push(dependency.clone());
        }

        Ok(DependencyReport {
            activated,
            missing_optional,
        })
    }

    /// `names` and their transitive required dependencies, dependencies first.
    pub fn activation_order(&self, names: &[String]) -> Result<Vec<String>, PluginError> {
        topological_order(&self.registry.dependency_graph(), names)
            .map_err(|cycle| PluginError::CyclicDependency { cycle })
    }

    /// Registered plugins that directly require `name`, in registration order.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.registry
            .list_all()
            .into_iter()
            .filter(|r| r.depends_on(name))
            .map(|r| r.name)
            .collect()
    }

    fn info(&self, name: &str) -> Result<crate::plugins::PluginRegistration, PluginError> {
        self.registry
            .get_info(name)
            .ok_or_else(|| PluginError::NotRegistered {
                name: name.to_string(),
            })
    }

    fn unregistered(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter(|d| !self.registry.contains(d))
            .cloned()
            .collect()
    }
}
