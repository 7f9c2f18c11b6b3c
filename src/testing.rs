//! Plugins and helpers shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::BoxError;
use crate::lifecycle::PluginContext;
use crate::plugins::{BoxFactory, Plugin, factory_fn};

#[derive(Debug, Default)]
pub struct NoopPlugin;

#[async_trait]
impl Plugin for NoopPlugin {
    async fn activate(&self, _ctx: &PluginContext) -> Result<(), BoxError> {
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Counts calls and optionally fails on activate or deactivate.
#[derive(Debug, Default)]
pub struct Probe {
    pub activations: AtomicUsize,
    pub deactivations: AtomicUsize,
    pub fail_activate: bool,
    pub fail_deactivate: bool,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_activate() -> Arc<Self> {
        Arc::new(Self {
            fail_activate: true,
            ..Self::default()
        })
    }

    pub fn failing_deactivate() -> Arc<Self> {
        Arc::new(Self {
            fail_deactivate: true,
            ..Self::default()
        })
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for Probe {
    async fn activate(&self, _ctx: &PluginContext) -> Result<(), BoxError> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        if self.fail_activate {
            return Err("activation refused".into());
        }
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), BoxError> {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        if self.fail_deactivate {
            return Err("cleanup failed".into());
        }
        Ok(())
    }
}

/// Factory that always hands out the same shared instance.
pub fn shared<P: Plugin + 'static>(plugin: Arc<P>) -> BoxFactory {
    factory_fn(move |_| Ok(plugin.clone() as Arc<dyn Plugin>))
}
