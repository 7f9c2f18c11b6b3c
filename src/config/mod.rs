//! Configuration collaborator.
//!
//! The runtime never reads files. Hosts hand it a [`ConfigProvider`]; plugin
//! sections live under `plugins.<name>` and runtime settings under `runtime`.
//!
//! ```rust,no_run
//! use plugin_runtime::config::{ConfigBuilder, MemoryConfigProvider};
//! use serde_json::json;
//!
//! let provider = ConfigBuilder::new()
//!     .env_prefixed("HOST_")
//!     .memory(MemoryConfigProvider::new().json("plugins.cache", json!({"ttl": 30})))
//!     .build();
//! ```

pub mod composite;
pub mod env;
pub mod memory;
pub mod provider;
pub mod runtime;
pub mod schema;
pub mod validator;

pub use composite::CompositeConfigProvider;
pub use env::EnvConfigProvider;
pub use memory::MemoryConfigProvider;
pub use provider::{ConfigProvider, ConfigProviderExt};
pub use runtime::{PLUGIN_CONFIG_PREFIX, RUNTIME_CONFIG_KEY, RuntimeConfig, plugin_config_key};
pub use schema::ConfigSchema;
pub use validator::{ConfigValidator, ValueType};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("{0}")]
    ValidationErrors(ValidationErrors),
}

#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msgs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "Validation failed: {}", msgs.join("; "))
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Assembles a layered provider; layers added first take precedence.
#[derive(Default)]
pub struct ConfigBuilder {
    composite: CompositeConfigProvider,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env(self) -> Self {
        self.provider(EnvConfigProvider::new())
    }

    pub fn env_prefixed(self, prefix: &str) -> Self {
        self.provider(EnvConfigProvider::prefixed(prefix))
    }

    pub fn memory(self, provider: MemoryConfigProvider) -> Self {
        self.provider(provider)
    }

    pub fn provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.composite = self.composite.layer(provider);
        self
    }

    pub fn build(self) -> CompositeConfigProvider {
        self.composite
    }
}

/// Shallow merge of two JSON objects; keys in `overrides` win.
///
/// A non-object `overrides` replaces `base` entirely, and `Null` leaves it as is.
pub fn merge_shallow(base: serde_json::Value, overrides: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match (base, overrides) {
        (base, Value::Null) => base,
        (Value::Object(mut base), Value::Object(overrides)) => {
            base.extend(overrides);
            Value::Object(base)
        }
        (_, overrides) => overrides,
    }
}
