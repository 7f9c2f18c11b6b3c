//! Runtime-wide settings.

use serde::{Deserialize, Serialize};

use super::ConfigResult;
use super::provider::{ConfigProvider, ConfigProviderExt};
use crate::sandbox::SandboxConfig;

/// Key under which [`RuntimeConfig`] is read from a provider.
pub const RUNTIME_CONFIG_KEY: &str = "runtime";

/// Key prefix of per-plugin configuration sections.
pub const PLUGIN_CONFIG_PREFIX: &str = "plugins.";

pub fn plugin_config_key(name: &str) -> String {
    format!("{}{}", PLUGIN_CONFIG_PREFIX, name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    pub sandbox: SandboxConfig,
    pub metrics: bool,
    pub auto_activate: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sandbox: SandboxConfig::default(),
            metrics: true,
            auto_activate: true,
        }
    }
}

impl RuntimeConfig {
    /// Reads the `runtime` key, falling back to defaults when absent.
    pub async fn load(provider: &dyn ConfigProvider) -> ConfigResult<Self> {
        Ok(provider
            .get::<RuntimeConfig>(RUNTIME_CONFIG_KEY)
            .await?
            .unwrap_or_default())
    }
}
