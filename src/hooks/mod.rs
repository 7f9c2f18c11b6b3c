//! Hook chain engine.
//!
//! A hook is a named extension point. Handlers attach to it with a priority
//! and the chain folds a JSON payload through them, highest priority first.
//! A failing handler is logged and skipped; it never aborts the chain.

mod error;
mod manager;
mod traits;

pub use error::{HookExecutionError, HookReport};
pub use manager::{HookInfo, HookManager};
pub use traits::{
    AsyncFnHook, BoxHookHandler, FnHook, HookContext, HookHandler, HookId, HookOptions, HookSpec,
    async_hook_fn, hook_fn,
};
