//! The lifecycle controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::{Value, json};
use tracing::Instrument;

use super::{
    ContextId, NameLocks, PluginContext, PluginState, RuntimeBuilder, ShutdownReport, StartReport,
};
use crate::api::PluginApi;
use crate::bus::{
    ACTIVATED_TOPIC, BoxMessageHandler, DEACTIVATED_TOPIC, Message, MessageBus, PublishReport,
    Subscription,
};
use crate::common::{isolate, isolate_sync};
use crate::config::{ConfigProvider, ConfigProviderExt, merge_shallow, plugin_config_key};
use crate::hooks::{BoxHookHandler, HookContext, HookId, HookManager, HookOptions, HookReport};
use crate::observability::{PluginLogger, RuntimeMetrics, SpanContext};
use crate::plugins::{
    BoxFactory, Plugin, PluginError, PluginInfo, PluginOptions, PluginRegistration, PluginRegistry,
    RegisterOutcome,
};
use crate::resolver::{DependencyActivator, DependencyResolver};
use crate::sandbox::CapabilitySandbox;

/// Sender id of lifecycle events.
pub const RUNTIME_SENDER: &str = "runtime";
/// Sender id of messages sent through the runtime's host surface.
pub const HOST_SENDER: &str = "host";

/// Lifecycle events raised while name locks are held. They are published only
/// after every lock of the operation is released, so subscribers may call
/// back into the runtime.
#[derive(Default)]
struct PendingEvents(tokio::sync::Mutex<Vec<Message>>);

impl PendingEvents {
    async fn push(&self, message: Message) {
        self.0.lock().await.push(message);
    }

    async fn publish(self, bus: &MessageBus) {
        for message in self.0.into_inner() {
            bus.publish(message).await;
        }
    }
}

/// Activates required dependencies on behalf of one top-level operation.
struct Cascade<'r> {
    runtime: &'r PluginRuntime,
    events: &'r PendingEvents,
}

impl DependencyActivator for Cascade<'_> {
    fn activate_dependency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), PluginError>> {
        Box::pin(async move {
            self.runtime
                .activate_with(name, Value::Null, self.events)
                .await
                .map(|_| ())
        })
    }
}

struct ActivePlugin {
    instance: Arc<dyn Plugin>,
    context: PluginContext,
    sequence: u64,
}

/// Owns the registry, hook engine, message bus and sandbox, and drives every
/// plugin through its lifecycle.
///
/// Transitions on one name are serialized by a per-name lock; different names
/// proceed concurrently.
///
/// # Example
///
/// ```rust,no_run
/// use plugin_runtime::{PluginOptions, PluginRuntime, factory_of};
/// # use plugin_runtime::{BoxError, Plugin, PluginContext};
/// # #[derive(Default)] struct Db;
/// # #[async_trait::async_trait] impl Plugin for Db {
/// #     async fn activate(&self, _: &PluginContext) -> Result<(), BoxError> { Ok(()) }
/// #     async fn deactivate(&self) -> Result<(), BoxError> { Ok(()) }
/// # }
///
/// # async fn run() -> Result<(), plugin_runtime::Error> {
/// let runtime = PluginRuntime::new();
/// runtime.register("db", factory_of::<Db>(), PluginOptions::new().version("1.0.0"))?;
/// runtime.activate("db", serde_json::json!({"pool": 4})).await?;
/// assert!(runtime.is_active("db"));
/// runtime.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct PluginRuntime {
    registry: PluginRegistry,
    hooks: Arc<HookManager>,
    bus: MessageBus,
    sandbox: CapabilitySandbox,
    config_provider: Option<Arc<dyn ConfigProvider>>,
    locks: NameLocks,
    active: DashMap<String, ActivePlugin>,
    metrics: Arc<RuntimeMetrics>,
    spans: Arc<SpanContext>,
    sequence: AtomicU64,
    auto_activate: bool,
}

impl PluginRuntime {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub(super) fn from_builder(builder: RuntimeBuilder) -> Self {
        let config = builder.config;
        let metrics = Arc::new(RuntimeMetrics::new(config.metrics));
        let spans = Arc::new(SpanContext::default());
        let hooks = HookManager::new()
            .with_metrics(metrics.clone())
            .with_spans(spans.clone());

        tracing::debug!(
            runtime_id = %spans.runtime_id(),
            sandbox = config.sandbox.enabled,
            metrics = config.metrics,
            "Plugin runtime created"
        );

        Self {
            registry: PluginRegistry::new(),
            hooks: Arc::new(hooks),
            bus: MessageBus::instrumented(metrics.clone(), spans.clone()),
            sandbox: CapabilitySandbox::new(config.sandbox),
            config_provider: builder.config_provider,
            locks: NameLocks::new(),
            active: DashMap::new(),
            metrics,
            spans,
            sequence: AtomicU64::new(0),
            auto_activate: config.auto_activate,
        }
    }

    // ------------------------------------------------------------------
    // Registration and queries
    // ------------------------------------------------------------------

    pub fn register(
        &self,
        name: &str,
        factory: BoxFactory,
        options: PluginOptions,
    ) -> Result<RegisterOutcome, PluginError> {
        self.registry.register(name, factory, options)
    }

    /// The active instance, if any.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.active.get(name).map(|a| a.instance.clone())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    /// The context of the current activation.
    pub fn context(&self, name: &str) -> Option<PluginContext> {
        self.active.get(name).map(|a| a.context.clone())
    }

    pub fn get_plugin_info(&self, name: &str) -> Option<PluginInfo> {
        self.registry.get_info(name)
    }

    pub fn get_all_plugins(&self) -> Vec<PluginInfo> {
        self.registry.list_all()
    }

    /// Active plugin names in activation order.
    pub fn active_plugins(&self) -> Vec<String> {
        let mut active: Vec<(u64, String)> = self
            .active
            .iter()
            .map(|a| (a.sequence, a.key().clone()))
            .collect();
        active.sort_by_key(|(seq, _)| *seq);
        active.into_iter().map(|(_, name)| name).collect()
    }

    pub fn resolver(&self) -> DependencyResolver<'_> {
        DependencyResolver::new(&self.registry)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn hooks(&self) -> &Arc<HookManager> {
        &self.hooks
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn sandbox(&self) -> &CapabilitySandbox {
        &self.sandbox
    }

    pub fn metrics(&self) -> &Arc<RuntimeMetrics> {
        &self.metrics
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Activate `name` with the caller's configuration object.
    ///
    /// Idempotent: an already active plugin is returned as is and its
    /// `activate` is not called again.
    pub async fn activate(&self, name: &str, config: Value) -> Result<Arc<dyn Plugin>, PluginError> {
        let events = PendingEvents::default();
        let result = self.activate_with(name, config, &events).await;
        // Dependencies that came up still announce themselves on failure.
        events.publish(&self.bus).await;
        result
    }

    async fn activate_with(
        &self,
        name: &str,
        config: Value,
        events: &PendingEvents,
    ) -> Result<Arc<dyn Plugin>, PluginError> {
        self.ensure_acyclic(name)?;
        let _guard = self.locks.acquire(name).await;

        if let Some(instance) = self.get(name) {
            tracing::debug!(plugin = %name, "Already active");
            return Ok(instance);
        }
        self.activate_locked(name, config, events).await
    }

    /// Deactivate `name`. Returns `Ok(false)` if it was not active.
    ///
    /// Hooks and subscriptions owned by the plugin are removed and it ends up
    /// `Inactive` even when its own `deactivate` fails; that failure is then
    /// returned as `PluginError::Deactivation`.
    pub async fn deactivate(&self, name: &str) -> Result<bool, PluginError> {
        if !self.registry.contains(name) {
            return Err(PluginError::NotRegistered {
                name: name.to_string(),
            });
        }
        let events = PendingEvents::default();
        let result = {
            let _guard = self.locks.acquire(name).await;
            self.deactivate_locked(name, &events).await
        };
        events.publish(&self.bus).await;
        result
    }

    /// Deactivate then activate under one lock. With `config` of `None` the
    /// previous activation's configuration is reused.
    pub async fn reload(
        &self,
        name: &str,
        config: Option<Value>,
    ) -> Result<Arc<dyn Plugin>, PluginError> {
        self.ensure_acyclic(name)?;
        let events = PendingEvents::default();
        let result = {
            let _guard = self.locks.acquire(name).await;

            let previous = self.active.get(name).map(|a| a.context.config.clone());
            if let Err(e) = self.deactivate_locked(name, &events).await {
                tracing::warn!(plugin = %name, error = %e, "Deactivate failed during reload, continuing");
            }

            let config = config.or(previous).unwrap_or(Value::Null);
            self.activate_locked(name, config, &events).await
        };
        events.publish(&self.bus).await;
        result
    }

    /// Activate every auto-activate registration, dependencies first.
    ///
    /// Failures are logged and collected; they do not stop the others.
    pub async fn start(&self) -> StartReport {
        let mut report = StartReport::default();
        if !self.auto_activate {
            tracing::debug!("Auto-activation disabled");
            return report;
        }

        let roots: Vec<String> = self
            .registry
            .list_all()
            .into_iter()
            .filter(|r| r.auto_activate)
            .map(|r| r.name)
            .collect();

        let order = match self.resolver().activation_order(&roots) {
            Ok(order) => order.into_iter().filter(|n| roots.contains(n)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not order auto-activation, using registration order");
                roots
            }
        };

        for name in order {
            if self.is_active(&name) {
                continue;
            }
            match self.activate(&name, Value::Null).await {
                Ok(_) => report.activated.push(name),
                Err(e) => {
                    tracing::warn!(plugin = %name, error = %e, "Auto-activation failed");
                    report.failed.push(e);
                }
            }
        }

        tracing::info!(
            activated = report.activated.len(),
            failed = report.failed.len(),
            "Plugin runtime started"
        );
        report
    }

    /// Deactivate every active plugin, most recently activated first, then
    /// drop all registrations, hooks and subscriptions.
    ///
    /// Never fails: each plugin's error is logged and collected.
    pub async fn shutdown(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        let mut order = self.active_plugins();
        order.reverse();

        for name in order {
            let events = PendingEvents::default();
            let outcome = {
                let _guard = self.locks.acquire(&name).await;
                self.deactivate_locked(&name, &events).await
            };
            events.publish(&self.bus).await;
            match outcome {
                Ok(true) => report.deactivated.push(name),
                Ok(false) => {}
                Err(e) => {
                    let err = PluginError::Shutdown {
                        plugin: name,
                        reason: e.to_string(),
                    };
                    tracing::error!(error = %err, "Shutdown step failed, continuing");
                    report.failures.push(err);
                }
            }
        }

        self.hooks.clear().await;
        self.bus.clear().await;
        self.registry.clear();
        self.locks.clear();

        tracing::info!(
            deactivated = report.deactivated.len(),
            failed = report.failures.len(),
            "Plugin runtime shut down"
        );
        report
    }

    fn ensure_acyclic(&self, name: &str) -> Result<(), PluginError> {
        if !self.registry.contains(name) {
            return Err(PluginError::NotRegistered {
                name: name.to_string(),
            });
        }
        // Checked before any lock is taken so nested locks only follow DAG edges.
        match self.resolver().detect_cycle(name) {
            Some(cycle) => Err(PluginError::CyclicDependency { cycle }),
            None => Ok(()),
        }
    }

    async fn activate_locked(
        &self,
        name: &str,
        config: Value,
        events: &PendingEvents,
    ) -> Result<Arc<dyn Plugin>, PluginError> {
        let previous = self
            .registry
            .state(name)
            .ok_or_else(|| PluginError::NotRegistered {
                name: name.to_string(),
            })?;
        if !previous.can_activate() {
            return Err(PluginError::Activation {
                plugin: name.to_string(),
                reason: format!("cannot activate from state {previous}"),
            });
        }
        self.registry.set_state(name, PluginState::Activating);

        let span = self.spans.activate_span(name);
        let started = Instant::now();
        let result = self
            .bring_up(name, config, events)
            .instrument(span.clone())
            .await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        span.record("duration_ms", latency_ms);

        match result {
            Ok(instance) => {
                self.metrics.record_activation(true, latency_ms);
                Ok(instance)
            }
            Err(e) => {
                self.registry.set_state(name, previous);
                self.hooks.remove_owner(name).await;
                self.bus.unsubscribe_owner(name).await;
                self.metrics.record_activation(false, latency_ms);
                tracing::warn!(plugin = %name, state = %previous, error = %e, "Activation failed");
                Err(e)
            }
        }
    }

    async fn bring_up(
        &self,
        name: &str,
        config: Value,
        events: &PendingEvents,
    ) -> Result<Arc<dyn Plugin>, PluginError> {
        let cascade = Cascade {
            runtime: self,
            events,
        };
        self.resolver().check_dependencies(name, &cascade).await?;

        let registration = self
            .registry
            .get_info(name)
            .ok_or_else(|| PluginError::NotRegistered {
                name: name.to_string(),
            })?;
        let factory = self
            .registry
            .factory(name)
            .ok_or_else(|| PluginError::NotRegistered {
                name: name.to_string(),
            })?;

        let config = self.effective_config(&registration, config).await?;

        let context_id = ContextId::new();
        let logger = PluginLogger::new(name).with_context_id(context_id);
        let granted = self.sandbox.grant(name, &registration.permissions);
        let scope = self.sandbox.scope(name, granted.clone(), logger.clone());

        let instance = self
            .sandbox
            .instantiate(factory.as_ref(), &scope)
            .map_err(|e| PluginError::Activation {
                plugin: name.to_string(),
                reason: e.to_string(),
            })?;

        let api = PluginApi::new(
            name,
            granted.clone(),
            self.sandbox.is_enabled(),
            self.bus.clone(),
            self.hooks.clone(),
        );
        let context = PluginContext {
            id: context_id,
            plugin_name: name.to_string(),
            config,
            api,
            logger,
            permissions: granted.into_iter().collect(),
            created_at: Utc::now(),
        };

        isolate(instance.activate(&context))
            .await
            .map_err(|fault| PluginError::Activation {
                plugin: name.to_string(),
                reason: fault.to_string(),
            })?;

        let specs = match isolate_sync(|| Ok::<_, PluginError>(instance.register_hooks())) {
            Ok(specs) => specs,
            Err(fault) => {
                // Activation already ran; give the instance a chance to undo it.
                if let Err(undo) = isolate(instance.deactivate()).await {
                    tracing::warn!(plugin = %name, error = %undo, "Rollback deactivate failed");
                }
                return Err(PluginError::Activation {
                    plugin: name.to_string(),
                    reason: format!("register_hooks: {}", fault),
                });
            }
        };
        for spec in specs {
            self.hooks
                .register_owned(&spec.chain, spec.handler, spec.options, name)
                .await;
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.registry.mark_activated(name);
        self.active.insert(
            name.to_string(),
            ActivePlugin {
                instance: instance.clone(),
                context: context.clone(),
                sequence,
            },
        );

        tracing::info!(
            plugin = %name,
            version = %registration.version,
            context_id = %context.id,
            "Plugin activated"
        );

        events
            .push(Message::new(
                ACTIVATED_TOPIC,
                RUNTIME_SENDER,
                "activated",
                json!({
                    "plugin": name,
                    "version": registration.version,
                    "contextId": context.id,
                }),
            ))
            .await;

        Ok(instance)
    }

    async fn deactivate_locked(
        &self,
        name: &str,
        events: &PendingEvents,
    ) -> Result<bool, PluginError> {
        let Some((_, active)) = self.active.remove(name) else {
            tracing::warn!(plugin = %name, "Deactivate requested for a plugin that is not active");
            return Ok(false);
        };

        let still_active: Vec<String> = self
            .resolver()
            .dependents_of(name)
            .into_iter()
            .filter(|d| self.is_active(d))
            .collect();
        if !still_active.is_empty() {
            tracing::warn!(
                plugin = %name,
                dependents = %still_active.join(", "),
                "Deactivating a plugin that active plugins depend on"
            );
        }

        self.registry.set_state(name, PluginState::Deactivating);
        let outcome = isolate(active.instance.deactivate())
            .instrument(self.spans.deactivate_span(name))
            .await;

        let hooks = self.hooks.remove_owner(name).await;
        let subscriptions = self.bus.unsubscribe_owner(name).await;
        self.registry.mark_deactivated(name);
        self.metrics.record_deactivation(outcome.is_ok());

        tracing::info!(
            plugin = %name,
            context_id = %active.context.id,
            hooks,
            subscriptions,
            clean = outcome.is_ok(),
            "Plugin deactivated"
        );

        events
            .push(Message::new(
                DEACTIVATED_TOPIC,
                RUNTIME_SENDER,
                "deactivated",
                json!({ "plugin": name, "contextId": active.context.id }),
            ))
            .await;

        outcome.map(|()| true).map_err(|fault| PluginError::Deactivation {
            plugin: name.to_string(),
            reason: fault.to_string(),
        })
    }

    async fn effective_config(
        &self,
        registration: &PluginRegistration,
        config: Value,
    ) -> Result<Value, PluginError> {
        let invalid = |reason: String| PluginError::InvalidConfig {
            plugin: registration.name.clone(),
            reason,
        };

        let base = match &self.config_provider {
            Some(provider) => provider
                .get_section(&plugin_config_key(&registration.name))
                .await
                .map_err(|e| invalid(e.to_string()))?
                .unwrap_or(Value::Null),
            None => Value::Null,
        };

        let merged = match merge_shallow(base, config) {
            Value::Null => json!({}),
            merged => merged,
        };

        if let Some(schema) = &registration.config_schema {
            schema.validate(&merged).map_err(|e| invalid(e.to_string()))?;
        }
        Ok(merged)
    }

    // ------------------------------------------------------------------
    // Host surface over the hook engine and the bus
    // ------------------------------------------------------------------

    pub async fn register_hook(
        &self,
        chain: &str,
        handler: BoxHookHandler,
        options: HookOptions,
    ) -> HookId {
        self.hooks.register_hook(chain, handler, options).await
    }

    pub async fn remove_hook(&self, chain: &str, id: HookId) -> bool {
        self.hooks.remove_hook(chain, id).await
    }

    pub async fn execute_hook(&self, chain: &str, payload: Value, ctx: &HookContext) -> Value {
        self.hooks.execute_hook(chain, payload, ctx).await
    }

    pub async fn execute_hook_with_report(
        &self,
        chain: &str,
        payload: Value,
        ctx: &HookContext,
    ) -> HookReport {
        self.hooks.execute_hook_with_report(chain, payload, ctx).await
    }

    pub async fn send_message(&self, target: &str, kind: &str, payload: Value) -> PublishReport {
        self.bus.send_message(HOST_SENDER, target, kind, payload).await
    }

    pub async fn broadcast_message(&self, kind: &str, payload: Value) -> PublishReport {
        self.bus.broadcast_message(HOST_SENDER, kind, payload).await
    }

    pub async fn subscribe(&self, topic: &str, handler: BoxMessageHandler) -> Subscription {
        self.bus.subscribe(topic, handler).await
    }

    pub async fn publish(&self, message: Message) -> PublishReport {
        self.bus.publish(message).await
    }
}

impl Default for PluginRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRuntime")
            .field("runtime_id", &self.spans.runtime_id())
            .field("registered", &self.registry.len())
            .field("active", &self.active_plugins())
            .field("sandbox", &self.sandbox.is_enabled())
            .finish()
    }
}
