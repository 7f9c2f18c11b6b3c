//! Plugins: the instance trait, factories, registration records and the
//! registry that catalogs them.
//!
//! Discovery is the host's job. Whatever finds plugins hands
//! `(name, factory, options)` to the runtime, which stores them here.

mod error;
mod registration;
mod registry;
mod traits;

pub use error::PluginError;
pub use registration::{PluginInfo, PluginOptions, PluginRegistration, RegisterOutcome};
pub use registry::PluginRegistry;
pub use traits::{BoxFactory, FnFactory, Plugin, PluginFactory, factory_fn, factory_of};
