//! # plugin-runtime
//!
//! An in-process plugin runtime for async Rust hosts.
//!
//! Plugins register under a unique name with a factory and options, declare
//! required and optional dependencies, and are activated in dependency order
//! through a per-name serialized lifecycle. While active they extend the host
//! through prioritized hook chains and talk to each other over a
//! publish/subscribe message bus. A capability sandbox scopes what each
//! plugin's factory and API handle may reach.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plugin_runtime::prelude::*;
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! #[async_trait::async_trait]
//! impl Plugin for Greeter {
//!     async fn activate(&self, ctx: &PluginContext) -> std::result::Result<(), BoxError> {
//!         ctx.logger.info("ready");
//!         Ok(())
//!     }
//!
//!     async fn deactivate(&self) -> std::result::Result<(), BoxError> {
//!         Ok(())
//!     }
//!
//!     fn register_hooks(&self) -> Vec<HookSpec> {
//!         vec![HookSpec::new(
//!             "greeting",
//!             hook_fn(|payload, _| Ok(Some(json!(format!("hello, {}", payload))))),
//!         )]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let runtime = PluginRuntime::new();
//!     runtime.register("greeter", factory_of::<Greeter>(), PluginOptions::new())?;
//!     runtime.activate("greeter", json!({})).await?;
//!
//!     let out = runtime
//!         .execute_hook("greeting", json!("world"), &HookContext::new())
//!         .await;
//!     println!("{out}");
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod api;
pub mod bus;
pub mod common;
pub mod config;
pub mod hooks;
pub mod lifecycle;
pub mod observability;
pub mod plugins;
pub mod prelude;
pub mod resolver;
pub mod sandbox;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use api::PluginApi;
pub use bus::{
    ACTIVATED_TOPIC, BROADCAST_TOPIC, BoxMessageHandler, DEACTIVATED_TOPIC, Message, MessageBus,
    MessageDeliveryError, MessageHandler, PublishReport, Subscription, SubscriptionId,
    async_handler_fn, direct_topic, handler_fn,
};
pub use config::{
    CompositeConfigProvider, ConfigBuilder, ConfigError, ConfigProvider, ConfigProviderExt,
    ConfigSchema, EnvConfigProvider, MemoryConfigProvider, RuntimeConfig, ValueType,
};
pub use hooks::{
    BoxHookHandler, HookContext, HookExecutionError, HookHandler, HookId, HookManager,
    HookOptions, HookReport, HookSpec, async_hook_fn, hook_fn,
};
pub use lifecycle::{
    ContextId, PluginContext, PluginRuntime, PluginState, RuntimeBuilder, ShutdownReport,
    StartReport,
};
pub use observability::{PluginLogger, RuntimeMetrics, SpanContext};
pub use plugins::{
    BoxFactory, Plugin, PluginError, PluginFactory, PluginInfo, PluginOptions, PluginRegistry,
    RegisterOutcome, factory_fn, factory_of,
};
pub use resolver::{DependencyActivator, DependencyResolver};
pub use sandbox::{Capability, CapabilitySandbox, HostScope, SandboxConfig, SandboxError};

/// Error type returned by plugin code: activate, deactivate, factories and
/// handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for plugin-runtime operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Registration, dependency or lifecycle failure.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Capability check or plugin construction failed.
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    /// A hook handler failed.
    #[error(transparent)]
    Hook(#[from] HookExecutionError),

    /// A message handler failed.
    #[error(transparent)]
    Delivery(#[from] MessageDeliveryError),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid registrations, options or configuration
    Configuration,
    /// Missing, cyclic or failing dependencies
    Dependency,
    /// Plugin code failed while running
    Execution,
    /// Capability checks
    Authorization,
    /// Serialization and unexpected states
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Plugin(err) => match err {
                PluginError::InvalidPlugin { .. }
                | PluginError::InvalidConfig { .. }
                | PluginError::NotRegistered { .. } => ErrorCategory::Configuration,
                PluginError::MissingDependencies { .. }
                | PluginError::DependencyActivation { .. }
                | PluginError::CyclicDependency { .. } => ErrorCategory::Dependency,
                PluginError::Activation { .. }
                | PluginError::Deactivation { .. }
                | PluginError::Shutdown { .. } => ErrorCategory::Execution,
                PluginError::PermissionDenied { .. } => ErrorCategory::Authorization,
            },
            Error::Config(_) => ErrorCategory::Configuration,
            Error::Sandbox(SandboxError::CapabilityDenied { .. }) => ErrorCategory::Authorization,
            Error::Sandbox(SandboxError::Construction { .. }) => ErrorCategory::Execution,
            Error::Hook(_) | Error::Delivery(_) => ErrorCategory::Execution,
            Error::Json(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_dependency_error(&self) -> bool {
        self.category() == ErrorCategory::Dependency
    }

    pub fn is_authorization_error(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    /// Name of the plugin the error is about, when there is one.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Error::Plugin(err) => err.plugin(),
            Error::Sandbox(
                SandboxError::CapabilityDenied { plugin, .. }
                | SandboxError::Construction { plugin, .. },
            ) => Some(plugin),
            Error::Hook(err) => err.owner.as_deref(),
            Error::Delivery(err) => err.owner.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
