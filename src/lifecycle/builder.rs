//! Builder for [`PluginRuntime`].

use std::sync::Arc;

use super::PluginRuntime;
use crate::config::{ConfigProvider, ConfigResult, RuntimeConfig};
use crate::sandbox::SandboxConfig;

#[derive(Default)]
pub struct RuntimeBuilder {
    pub(super) config: RuntimeConfig,
    pub(super) config_provider: Option<Arc<dyn ConfigProvider>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the `runtime` section of `provider` and keep the provider
    /// for per-plugin configuration.
    pub async fn from_provider(provider: Arc<dyn ConfigProvider>) -> ConfigResult<Self> {
        let config = RuntimeConfig::load(provider.as_ref()).await?;
        Ok(Self {
            config,
            config_provider: Some(provider),
        })
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sandbox(mut self, sandbox: SandboxConfig) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    pub fn metrics(mut self, enabled: bool) -> Self {
        self.config.metrics = enabled;
        self
    }

    pub fn auto_activate(mut self, enabled: bool) -> Self {
        self.config.auto_activate = enabled;
        self
    }

    pub fn config_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.config_provider = Some(Arc::new(provider));
        self
    }

    pub fn build(self) -> PluginRuntime {
        PluginRuntime::from_builder(self)
    }
}

impl std::fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBuilder")
            .field("config", &self.config)
            .field(
                "config_provider",
                &self.config_provider.as_ref().map(|p| p.name().to_string()),
            )
            .finish()
    }
}
