//! The plugin capability set and how instances are produced.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::BoxError;
use crate::hooks::HookSpec;
use crate::lifecycle::PluginContext;
use crate::sandbox::HostScope;

/// A loaded extension unit.
///
/// # Example
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use plugin_runtime::{BoxError, Plugin, PluginContext};
///
/// struct Greeter;
///
/// #[async_trait]
/// impl Plugin for Greeter {
///     async fn activate(&self, ctx: &PluginContext) -> Result<(), BoxError> {
///         ctx.logger.info("hello");
///         Ok(())
///     }
///
///     async fn deactivate(&self) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn activate(&self, ctx: &PluginContext) -> Result<(), BoxError>;

    async fn deactivate(&self) -> Result<(), BoxError>;

    /// Hooks registered on the plugin's behalf after a successful activation
    /// and removed when it deactivates.
    fn register_hooks(&self) -> Vec<HookSpec> {
        Vec::new()
    }
}

/// Produces plugin instances. Called once per activation.
pub trait PluginFactory: Send + Sync {
    fn create(&self, scope: &HostScope) -> Result<Arc<dyn Plugin>, BoxError>;
}

pub type BoxFactory = Arc<dyn PluginFactory>;

/// Closure-backed [`PluginFactory`].
pub struct FnFactory<F> {
    f: F,
}

impl<F> PluginFactory for FnFactory<F>
where
    F: Fn(&HostScope) -> Result<Arc<dyn Plugin>, BoxError> + Send + Sync,
{
    fn create(&self, scope: &HostScope) -> Result<Arc<dyn Plugin>, BoxError> {
        (self.f)(scope)
    }
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFactory")
    }
}

pub fn factory_fn<F>(f: F) -> BoxFactory
where
    F: Fn(&HostScope) -> Result<Arc<dyn Plugin>, BoxError> + Send + Sync + 'static,
{
    Arc::new(FnFactory { f })
}

/// Factory building a fresh `P` for every activation.
pub fn factory_of<P>() -> BoxFactory
where
    P: Plugin + Default + 'static,
{
    factory_fn(|_| Ok(Arc::new(P::default()) as Arc<dyn Plugin>))
}
