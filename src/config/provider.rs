//! Configuration provider trait.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{ConfigError, ConfigResult};

/// Source of raw configuration values.
///
/// Values are stored as strings; typed access goes through
/// [`ConfigProviderExt`], which treats every value as JSON.
#[async_trait::async_trait]
pub trait ConfigProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>>;

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()>;

    async fn delete(&self, key: &str) -> ConfigResult<bool>;

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>>;
}

/// Typed accessors layered over [`ConfigProvider`].
pub trait ConfigProviderExt: ConfigProvider {
    fn get<T: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = ConfigResult<Option<T>>> + Send
    where
        Self: Sync,
    {
        async move {
            match self.get_raw(key).await? {
                Some(raw) => serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(|e| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: e.to_string(),
                    }),
                None => Ok(None),
            }
        }
    }

    fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> impl std::future::Future<Output = ConfigResult<()>> + Send
    where
        Self: Sync,
    {
        async move {
            let raw = serde_json::to_string(value)?;
            self.set_raw(key, &raw).await
        }
    }

    /// Reads `key` as a JSON object. Any other JSON shape is rejected.
    fn get_section(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = ConfigResult<Option<Value>>> + Send
    where
        Self: Sync,
    {
        async move {
            match self.get::<Value>(key).await? {
                Some(value @ Value::Object(_)) => Ok(Some(value)),
                Some(other) => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected object, got {}", other),
                }),
                None => Ok(None),
            }
        }
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProviderExt for P {}
