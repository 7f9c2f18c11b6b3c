//! Prelude module for convenient imports.
//!
//! Re-exports what a host or a plugin author reaches for most often.
//!
//! # Usage
//!
//! ```rust
//! use plugin_runtime::prelude::*;
//! ```

// Core types
pub use crate::BoxError;
pub use crate::Error;
pub use crate::Result;

// Runtime
pub use crate::lifecycle::{PluginContext, PluginRuntime, PluginState, RuntimeBuilder};

// Plugins
pub use crate::plugins::{
    BoxFactory, Plugin, PluginError, PluginFactory, PluginInfo, PluginOptions, factory_fn,
    factory_of,
};

// Hooks
pub use crate::hooks::{HookContext, HookHandler, HookOptions, HookSpec, async_hook_fn, hook_fn};

// Messaging
pub use crate::bus::{Message, MessageHandler, async_handler_fn, handler_fn};

// Sandbox
pub use crate::api::PluginApi;
pub use crate::sandbox::{Capability, HostScope, SandboxConfig};

// Configuration
pub use crate::config::{ConfigProvider, ConfigSchema, MemoryConfigProvider, ValueType};
