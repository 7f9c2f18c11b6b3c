//! Layered configuration: the first layer holding a key wins.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

#[derive(Default, Clone)]
pub struct CompositeConfigProvider {
    layers: Vec<Arc<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with lower priority than every existing one.
    pub fn layer(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.layers.push(Arc::new(provider));
        self
    }

    pub fn push(&mut self, provider: Arc<dyn ConfigProvider>) {
        self.layers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for CompositeConfigProvider {
    fn name(&self) -> &str {
        "composite"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        for layer in &self.layers {
            if let Some(value) = layer.get_raw(key).await? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Writes go to the highest-priority layer that accepts them.
    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        for layer in &self.layers {
            match layer.set_raw(key, value).await {
                Ok(()) => return Ok(()),
                Err(ConfigError::Provider { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(ConfigError::Provider {
            message: format!("no writable layer for '{}'", key),
        })
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        let mut deleted = false;
        for layer in &self.layers {
            match layer.delete(key).await {
                Ok(true) => deleted = true,
                Ok(false) | Err(ConfigError::Provider { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(deleted)
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let mut keys = BTreeSet::new();
        for layer in &self.layers {
            keys.extend(layer.list_keys(prefix).await?);
        }
        Ok(keys.into_iter().collect())
    }
}

impl std::fmt::Debug for CompositeConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeConfigProvider")
            .field("layers", &self.layer_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvConfigProvider, MemoryConfigProvider};

    #[tokio::test]
    async fn test_first_layer_wins() {
        let composite = CompositeConfigProvider::new()
            .layer(MemoryConfigProvider::new().value("plugins.a", "1"))
            .layer(
                MemoryConfigProvider::new()
                    .value("plugins.a", "2")
                    .value("plugins.b", "3"),
            );

        assert_eq!(composite.get_raw("plugins.a").await.unwrap(), Some("1".into()));
        assert_eq!(composite.get_raw("plugins.b").await.unwrap(), Some("3".into()));
        assert_eq!(
            composite.list_keys("plugins.").await.unwrap(),
            vec!["plugins.a", "plugins.b"]
        );
    }

    #[tokio::test]
    async fn test_writes_skip_read_only_layers() {
        let composite = CompositeConfigProvider::new()
            .layer(EnvConfigProvider::prefixed("PLUGIN_RUNTIME_TEST_"))
            .layer(MemoryConfigProvider::new());

        composite.set_raw("runtime", "{}").await.unwrap();
        assert_eq!(composite.get_raw("runtime").await.unwrap(), Some("{}".into()));
        assert!(composite.delete("runtime").await.unwrap());
        assert!(!composite.delete("runtime").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_composite_rejects_writes() {
        let composite = CompositeConfigProvider::new();
        assert!(composite.is_empty());
        assert!(composite.set_raw("k", "v").await.is_err());
    }
}
