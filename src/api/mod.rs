//! Capability-scoped API handle given to each activated plugin.
//!
//! Everything a plugin does against the hook engine or the message bus goes
//! through here, stamped with the plugin's name as owner so the runtime can
//! clean up after it on deactivate. With the sandbox enabled each call first
//! checks the plugin's granted capabilities.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use crate::bus::{BoxMessageHandler, MessageBus, PublishReport, Subscription, direct_topic};
use crate::hooks::{BoxHookHandler, HookContext, HookId, HookManager, HookOptions, HookReport};
use crate::plugins::PluginError;
use crate::sandbox::Capability;

#[derive(Clone)]
pub struct PluginApi {
    plugin: String,
    granted: BTreeSet<Capability>,
    enforce: bool,
    bus: MessageBus,
    hooks: Arc<HookManager>,
}

impl PluginApi {
    pub fn new(
        plugin: impl Into<String>,
        granted: BTreeSet<Capability>,
        enforce: bool,
        bus: MessageBus,
        hooks: Arc<HookManager>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            granted,
            enforce,
            bus,
            hooks,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn has(&self, capability: Capability) -> bool {
        !self.enforce || self.granted.contains(&capability)
    }

    fn check(&self, capability: Capability) -> Result<(), PluginError> {
        if self.has(capability) {
            return Ok(());
        }
        tracing::warn!(
            plugin = %self.plugin,
            capability = %capability,
            "Plugin API call denied"
        );
        Err(PluginError::PermissionDenied {
            plugin: self.plugin.clone(),
            capability,
        })
    }

    /// Send to `target`'s direct channel with this plugin as sender.
    pub async fn send_message(
        &self,
        target: &str,
        kind: &str,
        payload: Value,
    ) -> Result<PublishReport, PluginError> {
        self.check(Capability::Messaging)?;
        Ok(self
            .bus
            .send_message(&self.plugin, target, kind, payload)
            .await)
    }

    pub async fn broadcast_message(
        &self,
        kind: &str,
        payload: Value,
    ) -> Result<PublishReport, PluginError> {
        self.check(Capability::Messaging)?;
        Ok(self.bus.broadcast_message(&self.plugin, kind, payload).await)
    }

    pub async fn subscribe(
        &self,
        topic: &str,
        handler: BoxMessageHandler,
    ) -> Result<Subscription, PluginError> {
        self.check(Capability::Messaging)?;
        Ok(self.bus.subscribe_owned(topic, handler, &self.plugin).await)
    }

    /// Subscribe to this plugin's own direct channel.
    pub async fn on_direct_message(
        &self,
        handler: BoxMessageHandler,
    ) -> Result<Subscription, PluginError> {
        self.subscribe(&direct_topic(&self.plugin), handler).await
    }

    pub async fn register_hook(
        &self,
        chain: &str,
        handler: BoxHookHandler,
        options: HookOptions,
    ) -> Result<HookId, PluginError> {
        self.check(Capability::Hooks)?;
        Ok(self
            .hooks
            .register_owned(chain, handler, options, &self.plugin)
            .await)
    }

    pub async fn remove_hook(&self, chain: &str, id: HookId) -> Result<bool, PluginError> {
        self.check(Capability::Hooks)?;
        Ok(self.hooks.remove_hook(chain, id).await)
    }

    /// Run a chain with this plugin recorded as the caller.
    pub async fn execute_hook(
        &self,
        chain: &str,
        payload: Value,
        data: Value,
    ) -> Result<HookReport, PluginError> {
        self.check(Capability::Hooks)?;
        let ctx = HookContext::new()
            .with_caller(self.plugin.clone())
            .with_data(data);
        Ok(self
            .hooks
            .execute_hook_with_report(chain, payload, &ctx)
            .await)
    }
}

impl std::fmt::Debug for PluginApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginApi")
            .field("plugin", &self.plugin)
            .field("granted", &self.granted)
            .field("enforce", &self.enforce)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::handler_fn;
    use crate::hooks::hook_fn;
    use serde_json::json;

    fn api(granted: &[Capability], enforce: bool) -> PluginApi {
        PluginApi::new(
            "probe",
            granted.iter().copied().collect(),
            enforce,
            MessageBus::new(),
            Arc::new(HookManager::new()),
        )
    }

    #[tokio::test]
    async fn test_denied_without_capability() {
        let api = api(&[Capability::Logging], true);
        assert!(matches!(
            api.broadcast_message("x", Value::Null).await,
            Err(PluginError::PermissionDenied {
                capability: Capability::Messaging,
                ..
            })
        ));
        assert!(
            api.register_hook("c", hook_fn(|_, _| Ok(None)), HookOptions::new())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_not_enforced_when_sandbox_off() {
        let api = api(&[], false);
        assert!(api.has(Capability::Hooks));
        assert!(api.broadcast_message("x", Value::Null).await.is_ok());
    }

    #[tokio::test]
    async fn test_owned_registrations() {
        let api = api(&Capability::ALL, true);
        api.register_hook("c", hook_fn(|_, _| Ok(None)), HookOptions::new())
            .await
            .unwrap();
        api.on_direct_message(handler_fn(|_| Ok(()))).await.unwrap();

        assert_eq!(api.hooks.chain("c").await[0].owner.as_deref(), Some("probe"));
        assert_eq!(api.hooks.remove_owner("probe").await, 1);
        assert_eq!(api.bus.unsubscribe_owner("probe").await, 1);
    }

    #[tokio::test]
    async fn test_execute_hook_sets_caller() {
        let api = api(&[Capability::Hooks], true);
        api.register_hook(
            "who",
            hook_fn(|_, ctx| Ok(Some(json!(ctx.caller)))),
            HookOptions::new(),
        )
        .await
        .unwrap();
        let report = api.execute_hook("who", Value::Null, Value::Null).await.unwrap();
        assert_eq!(report.payload, json!("probe"));
    }
}
