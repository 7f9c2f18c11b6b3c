//! Hook handler trait and the types that describe a registration.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::BoxError;

/// Opaque id returned by hook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HookId(Uuid);

impl HookId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Context passed alongside the payload to every handler in a chain.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    /// Chain being executed. Filled in by the manager.
    pub chain: String,
    /// Who asked for the chain to run (a plugin name, or `None` for the host).
    pub caller: Option<String>,
    /// Free-form data shared with every handler.
    pub data: Value,
}

impl HookContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// A handler attached to a hook chain.
///
/// Returning `Ok(Some(v))` replaces the payload for the rest of the chain;
/// `Ok(None)` leaves it unchanged. An error is logged and skipped.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, payload: Value, ctx: &HookContext) -> Result<Option<Value>, BoxError>;
}

pub type BoxHookHandler = Arc<dyn HookHandler>;

/// Adapter for synchronous closures.
pub struct FnHook<F> {
    f: F,
}

#[async_trait]
impl<F> HookHandler for FnHook<F>
where
    F: Fn(Value, &HookContext) -> Result<Option<Value>, BoxError> + Send + Sync,
{
    async fn handle(&self, payload: Value, ctx: &HookContext) -> Result<Option<Value>, BoxError> {
        (self.f)(payload, ctx)
    }
}

pub fn hook_fn<F>(f: F) -> BoxHookHandler
where
    F: Fn(Value, &HookContext) -> Result<Option<Value>, BoxError> + Send + Sync + 'static,
{
    Arc::new(FnHook { f })
}

/// Adapter for closures returning a future. The context is passed by value so
/// the future can own it.
pub struct AsyncFnHook<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> HookHandler for AsyncFnHook<F>
where
    F: Fn(Value, HookContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, BoxError>> + Send + 'static,
{
    async fn handle(&self, payload: Value, ctx: &HookContext) -> Result<Option<Value>, BoxError> {
        (self.f)(payload, ctx.clone()).await
    }
}

pub fn async_hook_fn<F, Fut>(f: F) -> BoxHookHandler
where
    F: Fn(Value, HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, BoxError>> + Send + 'static,
{
    Arc::new(AsyncFnHook { f })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookOptions {
    /// Higher runs first.
    pub priority: i32,
    /// Remove after the first chain execution that runs it.
    pub once: bool,
}

impl HookOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// A hook a plugin asks the runtime to register for it.
#[derive(Clone)]
pub struct HookSpec {
    pub chain: String,
    pub handler: BoxHookHandler,
    pub options: HookOptions,
}

impl HookSpec {
    pub fn new(chain: impl Into<String>, handler: BoxHookHandler) -> Self {
        Self {
            chain: chain.into(),
            handler,
            options: HookOptions::default(),
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.options.priority = priority;
        self
    }

    pub fn once(mut self) -> Self {
        self.options.once = true;
        self
    }
}

impl fmt::Debug for HookSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSpec")
            .field("chain", &self.chain)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_hook_replaces_payload() {
        let handler = hook_fn(|payload, _ctx| {
            let n = payload.as_i64().unwrap_or(0);
            Ok(Some(json!(n + 1)))
        });
        let out = handler.handle(json!(1), &HookContext::new()).await.unwrap();
        assert_eq!(out, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_async_hook_sees_context() {
        let handler = async_hook_fn(|_payload, ctx: HookContext| async move {
            Ok::<_, BoxError>(Some(json!({ "caller": ctx.caller })))
        });
        let ctx = HookContext::new().with_caller("auth");
        let out = handler.handle(Value::Null, &ctx).await.unwrap();
        assert_eq!(out, Some(json!({"caller": "auth"})));
    }

    #[test]
    fn test_hook_spec_builder() {
        let spec = HookSpec::new("request", hook_fn(|_, _| Ok(None)))
            .priority(7)
            .once();
        assert_eq!(spec.options, HookOptions::new().priority(7).once());
        assert_eq!(spec.chain, "request");
    }
}
