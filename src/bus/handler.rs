//! Subscriber callbacks.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::Message;
use crate::BoxError;

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<(), BoxError>;
}

pub type BoxMessageHandler = Arc<dyn MessageHandler>;

pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&Message) -> Result<(), BoxError> + Send + Sync,
{
    async fn handle(&self, message: &Message) -> Result<(), BoxError> {
        (self.f)(message)
    }
}

pub fn handler_fn<F>(f: F) -> BoxMessageHandler
where
    F: Fn(&Message) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(FnHandler { f })
}

/// Adapter for closures returning a future; each call gets its own clone of
/// the message.
pub struct AsyncFnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> MessageHandler for AsyncFnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn handle(&self, message: &Message) -> Result<(), BoxError> {
        (self.f)(message.clone()).await
    }
}

pub fn async_handler_fn<F, Fut>(f: F) -> BoxMessageHandler
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(AsyncFnHandler { f })
}
