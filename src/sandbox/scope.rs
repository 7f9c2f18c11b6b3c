//! The restricted host surface a plugin factory is constructed with.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Capability, SandboxError, SandboxResult};
use crate::observability::PluginLogger;

/// Host capabilities reachable from one plugin.
///
/// A restricted scope hands out only what was granted; an unrestricted one
/// (sandbox disabled) hands out everything.
#[derive(Debug, Clone)]
pub struct HostScope {
    plugin: String,
    granted: BTreeSet<Capability>,
    restricted: bool,
    logger: PluginLogger,
}

impl HostScope {
    pub fn restricted(
        plugin: impl Into<String>,
        granted: BTreeSet<Capability>,
        logger: PluginLogger,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            granted,
            restricted: true,
            logger,
        }
    }

    pub fn unrestricted(plugin: impl Into<String>, logger: PluginLogger) -> Self {
        Self {
            plugin: plugin.into(),
            granted: Capability::ALL.into_iter().collect(),
            restricted: false,
            logger,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    pub fn granted(&self) -> &BTreeSet<Capability> {
        &self.granted
    }

    pub fn has(&self, capability: Capability) -> bool {
        !self.restricted || self.granted.contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> SandboxResult<()> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(SandboxError::CapabilityDenied {
                plugin: self.plugin.clone(),
                capability,
            })
        }
    }

    pub fn timers(&self) -> SandboxResult<Timers> {
        self.require(Capability::Timers)?;
        Ok(Timers { _private: () })
    }

    pub fn logger(&self) -> SandboxResult<&PluginLogger> {
        self.require(Capability::Logging)?;
        Ok(&self.logger)
    }

    pub fn process(&self) -> SandboxResult<ProcessInfo> {
        self.require(Capability::Process)?;
        Ok(ProcessInfo::current())
    }
}

/// Timer facility granted by [`Capability::Timers`].
#[derive(Debug, Clone, Copy)]
pub struct Timers {
    _private: (),
}

impl Timers {
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    pub async fn timeout<F: Future>(
        &self,
        duration: Duration,
        fut: F,
    ) -> Result<F::Output, tokio::time::error::Elapsed> {
        tokio::time::timeout(duration, fut).await
    }
}

/// Process metadata granted by [`Capability::Process`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub os: &'static str,
    pub arch: &'static str,
    pub runtime_version: &'static str,
}

impl ProcessInfo {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            runtime_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(granted: &[Capability]) -> HostScope {
        HostScope::restricted(
            "probe",
            granted.iter().copied().collect(),
            PluginLogger::new("probe"),
        )
    }

    #[test]
    fn test_restricted_scope_denies_ungranted() {
        let scope = scope(&[Capability::Logging]);
        assert!(scope.logger().is_ok());
        assert!(matches!(
            scope.timers(),
            Err(SandboxError::CapabilityDenied {
                capability: Capability::Timers,
                ..
            })
        ));
        assert!(scope.process().is_err());
    }

    #[test]
    fn test_unrestricted_scope_allows_all() {
        let scope = HostScope::unrestricted("probe", PluginLogger::new("probe"));
        assert!(!scope.is_restricted());
        for cap in Capability::ALL {
            assert!(scope.has(cap));
        }
        let info = scope.process().unwrap();
        assert_eq!(info.pid, std::process::id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_timeout() {
        let timers = scope(&[Capability::Timers]).timers().unwrap();
        let result = timers
            .timeout(Duration::from_millis(10), timers.sleep(Duration::from_secs(1)))
            .await;
        assert!(result.is_err());
    }
}
