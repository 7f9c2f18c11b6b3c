//! Plugin lifecycle: state machine, activation context and the runtime that
//! drives both.

mod builder;
mod context;
mod locks;
mod report;
mod runtime;
mod state;

pub use builder::RuntimeBuilder;
pub use context::{ContextId, PluginContext};
pub use locks::NameLocks;
pub use report::{ShutdownReport, StartReport};
pub use runtime::{HOST_SENDER, PluginRuntime, RUNTIME_SENDER};
pub use state::PluginState;
