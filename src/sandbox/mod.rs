//! Capability sandbox for plugin construction.
//!
//! A plain capability-object pattern: factories receive a [`HostScope`]
//! exposing only the host facilities they were granted. This is a
//! convenience boundary, not a security one; plugin code still runs
//! in-process.

mod capability;
mod config;
mod error;
mod scope;

pub use capability::Capability;
pub use config::SandboxConfig;
pub use error::{SandboxError, SandboxResult};
pub use scope::{HostScope, ProcessInfo, Timers};

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::common::isolate_sync;
use crate::observability::PluginLogger;
use crate::plugins::{Plugin, PluginFactory};

#[derive(Debug, Clone, Default)]
pub struct CapabilitySandbox {
    config: SandboxConfig,
}

impl CapabilitySandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn disabled() -> Self {
        Self::new(SandboxConfig::disabled())
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Capabilities effectively granted to a plugin declaring `declared`.
    ///
    /// With the sandbox disabled every capability is granted.
    pub fn grant(&self, plugin: &str, declared: &[Capability]) -> BTreeSet<Capability> {
        if !self.config.enabled {
            return Capability::ALL.into_iter().collect();
        }

        let (granted, denied): (Vec<_>, Vec<_>) = declared
            .iter()
            .copied()
            .partition(|cap| self.config.allows(*cap));

        if !denied.is_empty() {
            let denied: Vec<&str> = denied.iter().map(Capability::as_str).collect();
            tracing::warn!(
                plugin = %plugin,
                denied = %denied.join(", "),
                "Declared capabilities outside the sandbox allow-list were not granted"
            );
        }
        granted.into_iter().collect()
    }

    pub fn scope(
        &self,
        plugin: &str,
        granted: BTreeSet<Capability>,
        logger: PluginLogger,
    ) -> HostScope {
        if self.config.enabled {
            HostScope::restricted(plugin, granted, logger)
        } else {
            HostScope::unrestricted(plugin, logger)
        }
    }

    /// Run the factory inside `scope`, containing errors and panics.
    pub fn instantiate(
        &self,
        factory: &dyn PluginFactory,
        scope: &HostScope,
    ) -> SandboxResult<Arc<dyn Plugin>> {
        isolate_sync(|| factory.create(scope)).map_err(|fault| SandboxError::Construction {
            plugin: scope.plugin().to_string(),
            reason: fault.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxError;
    use crate::lifecycle::PluginContext;
    use crate::plugins::{BoxFactory, factory_fn};
    use async_trait::async_trait;

    struct Quiet;

    #[async_trait]
    impl Plugin for Quiet {
        async fn activate(&self, _ctx: &PluginContext) -> Result<(), BoxError> {
            Ok(())
        }

        async fn deactivate(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn needs_timers() -> BoxFactory {
        factory_fn(|scope: &HostScope| {
            scope.timers()?;
            Ok(Arc::new(Quiet) as Arc<dyn Plugin>)
        })
    }

    #[test]
    fn test_grant_intersects_allow_list() {
        let sandbox = CapabilitySandbox::new(
            SandboxConfig::enabled().allow_only([Capability::Logging, Capability::Messaging]),
        );
        let granted = sandbox.grant("p", &[Capability::Messaging, Capability::Process]);
        assert_eq!(granted, BTreeSet::from([Capability::Messaging]));
    }

    #[test]
    fn test_grant_dedups_and_orders() {
        let sandbox = CapabilitySandbox::new(SandboxConfig::enabled());
        let granted = sandbox.grant(
            "p",
            &[Capability::Hooks, Capability::Timers, Capability::Hooks],
        );
        assert_eq!(
            granted.into_iter().collect::<Vec<_>>(),
            vec![Capability::Timers, Capability::Hooks]
        );
    }

    #[test]
    fn test_disabled_grants_everything() {
        let granted = CapabilitySandbox::disabled().grant("p", &[]);
        assert_eq!(granted.len(), Capability::ALL.len());
    }

    #[test]
    fn test_instantiate_denied_capability() {
        let sandbox = CapabilitySandbox::new(SandboxConfig::enabled());
        let scope = sandbox.scope("p", BTreeSet::new(), PluginLogger::new("p"));
        let err = sandbox.instantiate(needs_timers().as_ref(), &scope).err().unwrap();
        assert!(err.to_string().contains("timers"));

        let scope = sandbox.scope(
            "p",
            BTreeSet::from([Capability::Timers]),
            PluginLogger::new("p"),
        );
        assert!(sandbox.instantiate(needs_timers().as_ref(), &scope).is_ok());
    }

    #[test]
    fn test_instantiate_contains_panic() {
        let factory = factory_fn(|_: &HostScope| -> Result<Arc<dyn Plugin>, BoxError> {
            panic!("constructor exploded")
        });
        let sandbox = CapabilitySandbox::disabled();
        let scope = sandbox.scope("p", BTreeSet::new(), PluginLogger::new("p"));
        let err = sandbox.instantiate(factory.as_ref(), &scope).err().unwrap();
        assert!(matches!(err, SandboxError::Construction { .. }));
        assert!(err.to_string().contains("constructor exploded"));
    }
}
