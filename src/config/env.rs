//! Read-only configuration provider backed by environment variables.
//!
//! Keys map to variable names by upper-casing and replacing `.` with `_`,
//! so `plugins.cache` under prefix `APP_` reads `APP_PLUGINS_CACHE`.

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    prefix: Option<String>,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        let base = key.to_uppercase().replace(['.', '-'], "_");
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, base),
            None => base,
        }
    }

    fn key_from_env(&self, env_name: &str) -> Option<String> {
        let stripped = match &self.prefix {
            Some(prefix) => env_name.strip_prefix(prefix.as_str())?,
            None => env_name,
        };
        Some(stripped.to_lowercase().replace('_', "."))
    }
}

#[async_trait::async_trait]
impl ConfigProvider for EnvConfigProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        match std::env::var(self.env_key(key)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Env(e)),
        }
    }

    async fn set_raw(&self, _key: &str, _value: &str) -> ConfigResult<()> {
        Err(ConfigError::Provider {
            message: "environment variables are read-only at runtime".into(),
        })
    }

    async fn delete(&self, _key: &str) -> ConfigResult<bool> {
        Err(ConfigError::Provider {
            message: "environment variables are read-only at runtime".into(),
        })
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let mut keys: Vec<String> = std::env::vars()
            .filter_map(|(name, _)| self.key_from_env(&name))
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_mapping() {
        let provider = EnvConfigProvider::prefixed("HOST_");
        assert_eq!(provider.env_key("plugins.cache-store"), "HOST_PLUGINS_CACHE_STORE");
        assert_eq!(
            provider.key_from_env("HOST_PLUGINS_CACHE"),
            Some("plugins.cache".to_string())
        );
        assert_eq!(provider.key_from_env("OTHER_VAR"), None);
    }

    #[tokio::test]
    async fn test_reads_path_variable() {
        let provider = EnvConfigProvider::new();
        assert!(provider.get_raw("path").await.unwrap().is_some());
        assert!(
            provider
                .get_raw("plugin.runtime.surely.unset.key")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_read_only() {
        let provider = EnvConfigProvider::new();
        assert!(provider.set_raw("a", "b").await.is_err());
        assert!(provider.delete("a").await.is_err());
    }
}
