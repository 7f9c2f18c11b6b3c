//! Hook manager: named chains of handlers sorted by priority.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::Instrument;

use super::{BoxHookHandler, HookContext, HookExecutionError, HookId, HookOptions, HookReport};
use crate::common::isolate;
use crate::observability::{RuntimeMetrics, SpanContext};

struct HookRegistration {
    id: HookId,
    handler: BoxHookHandler,
    priority: i32,
    once: bool,
    owner: Option<String>,
    fired: AtomicBool,
}

/// Read-only view of one registered hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookInfo {
    pub id: HookId,
    pub priority: i32,
    pub once: bool,
    pub owner: Option<String>,
}

#[derive(Default)]
pub struct HookManager {
    chains: RwLock<HashMap<String, Vec<Arc<HookRegistration>>>>,
    metrics: Option<Arc<RuntimeMetrics>>,
    spans: Option<Arc<SpanContext>>,
}

impl HookManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: Arc<RuntimeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_spans(mut self, spans: Arc<SpanContext>) -> Self {
        self.spans = Some(spans);
        self
    }

    pub async fn register_hook(
        &self,
        chain: &str,
        handler: BoxHookHandler,
        options: HookOptions,
    ) -> HookId {
        self.insert(chain, handler, options, None).await
    }

    /// Register a hook on behalf of `owner`, removable with [`remove_owner`](Self::remove_owner).
    pub async fn register_owned(
        &self,
        chain: &str,
        handler: BoxHookHandler,
        options: HookOptions,
        owner: &str,
    ) -> HookId {
        self.insert(chain, handler, options, Some(owner.to_string()))
            .await
    }

    async fn insert(
        &self,
        chain: &str,
        handler: BoxHookHandler,
        options: HookOptions,
        owner: Option<String>,
    ) -> HookId {
        let registration = Arc::new(HookRegistration {
            id: HookId::new(),
            handler,
            priority: options.priority,
            once: options.once,
            owner,
            fired: AtomicBool::new(false),
        });
        let id = registration.id;

        let mut chains = self.chains.write().await;
        let list = chains.entry(chain.to_string()).or_default();
        // After every entry of equal or higher priority, so ties keep insertion order.
        let pos = list
            .iter()
            .position(|h| h.priority < options.priority)
            .unwrap_or(list.len());
        list.insert(pos, registration);

        tracing::debug!(
            chain = %chain,
            hook_id = %id,
            priority = options.priority,
            once = options.once,
            "Hook registered"
        );
        id
    }

    /// Returns whether a hook was removed. Removing an unknown id is a no-op.
    pub async fn remove_hook(&self, chain: &str, id: HookId) -> bool {
        let mut chains = self.chains.write().await;
        let Some(list) = chains.get_mut(chain) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| h.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            chains.remove(chain);
        }
        removed
    }

    /// Remove every hook registered for `owner`, across all chains.
    pub async fn remove_owner(&self, owner: &str) -> usize {
        let mut chains = self.chains.write().await;
        let mut removed = 0;
        for list in chains.values_mut() {
            let before = list.len();
            list.retain(|h| h.owner.as_deref() != Some(owner));
            removed += before - list.len();
        }
        chains.retain(|_, list| !list.is_empty());
        if removed > 0 {
            tracing::debug!(owner = %owner, removed, "Removed owned hooks");
        }
        removed
    }

    pub async fn chain(&self, chain: &str) -> Vec<HookInfo> {
        self.chains
            .read()
            .await
            .get(chain)
            .map(|list| {
                list.iter()
                    .map(|h| HookInfo {
                        id: h.id,
                        priority: h.priority,
                        once: h.once,
                        owner: h.owner.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn hook_count(&self, chain: &str) -> usize {
        self.chains.read().await.get(chain).map_or(0, Vec::len)
    }

    pub async fn chain_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.chains.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn clear(&self) {
        self.chains.write().await.clear();
    }

    /// Fold `payload` through the chain and return the final payload.
    pub async fn execute_hook(&self, chain: &str, payload: Value, ctx: &HookContext) -> Value {
        self.execute_hook_with_report(chain, payload, ctx)
            .await
            .payload
    }

    /// Like [`execute_hook`](Self::execute_hook) but also reports how many
    /// handlers ran and which of them failed.
    pub async fn execute_hook_with_report(
        &self,
        chain: &str,
        payload: Value,
        ctx: &HookContext,
    ) -> HookReport {
        // Handlers run against a snapshot so they may register or remove hooks.
        let snapshot: Vec<Arc<HookRegistration>> = self
            .chains
            .read()
            .await
            .get(chain)
            .cloned()
            .unwrap_or_default();

        if snapshot.is_empty() {
            return HookReport {
                payload,
                invoked: 0,
                failures: Vec::new(),
            };
        }

        let span = match &self.spans {
            Some(spans) => spans.hook_span(chain, snapshot.len()),
            None => tracing::Span::none(),
        };

        let report = self
            .fold(chain, snapshot, payload, ctx)
            .instrument(span.clone())
            .await;

        span.record("failures", report.failures.len());
        if let Some(metrics) = &self.metrics {
            metrics.record_hook(report.invoked as u64, report.failures.len() as u64);
        }
        report
    }

    async fn fold(
        &self,
        chain: &str,
        snapshot: Vec<Arc<HookRegistration>>,
        payload: Value,
        ctx: &HookContext,
    ) -> HookReport {
        let mut ctx = ctx.clone();
        ctx.chain = chain.to_string();

        let mut current = payload;
        let mut invoked = 0;
        let mut failures = Vec::new();
        let mut spent = Vec::new();

        for hook in snapshot {
            if hook.once {
                // A concurrent run may already have claimed it.
                if hook.fired.swap(true, Ordering::SeqCst) {
                    continue;
                }
                spent.push(hook.id);
            }

            invoked += 1;
            match isolate(hook.handler.handle(current.clone(), &ctx)).await {
                Ok(Some(next)) => current = next,
                Ok(None) => {}
                Err(fault) => {
                    tracing::warn!(
                        chain = %chain,
                        hook_id = %hook.id,
                        owner = hook.owner.as_deref().unwrap_or("-"),
                        error = %fault,
                        "Hook handler failed, continuing chain"
                    );
                    failures.push(HookExecutionError {
                        chain: chain.to_string(),
                        hook_id: hook.id,
                        owner: hook.owner.clone(),
                        reason: fault.reason,
                        panicked: fault.panicked,
                    });
                }
            }
        }

        if !spent.is_empty() {
            let mut chains = self.chains.write().await;
            if let Some(list) = chains.get_mut(chain) {
                list.retain(|h| !spent.contains(&h.id));
                if list.is_empty() {
                    chains.remove(chain);
                }
            }
        }

        HookReport {
            payload: current,
            invoked,
            failures,
        }
    }
}

impl std::fmt::Debug for HookManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookManager").finish_non_exhaustive()
    }
}
