//! Topic-based publish/subscribe with isolated concurrent fan-out.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use super::{BoxMessageHandler, Message, MessageDeliveryError, PublishReport};
use crate::common::isolate;
use crate::observability::{RuntimeMetrics, SpanContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Subscriber {
    id: SubscriptionId,
    owner: Option<String>,
    handler: BoxMessageHandler,
}

#[derive(Default)]
struct BusInner {
    topics: RwLock<HashMap<String, Vec<Arc<Subscriber>>>>,
    metrics: Option<Arc<RuntimeMetrics>>,
    spans: Option<Arc<SpanContext>>,
}

impl BusInner {
    async fn remove(&self, topic: Option<&str>, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write().await;
        let mut removed = false;
        for (name, subs) in topics.iter_mut() {
            if topic.is_some_and(|t| t != name) {
                continue;
            }
            let before = subs.len();
            subs.retain(|s| s.id != id);
            removed |= subs.len() != before;
        }
        topics.retain(|_, subs| !subs.is_empty());
        removed
    }
}

/// Message bus shared by the runtime, the host and every plugin API handle.
///
/// Cloning is cheap and every clone addresses the same subscriptions. The bus
/// keeps no history: a message reaches the subscribers present when it is
/// published and nobody else.
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instrumented(metrics: Arc<RuntimeMetrics>, spans: Arc<SpanContext>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                topics: RwLock::default(),
                metrics: Some(metrics),
                spans: Some(spans),
            }),
        }
    }

    pub async fn subscribe(&self, topic: &str, handler: BoxMessageHandler) -> Subscription {
        self.insert(topic, handler, None).await
    }

    /// Subscribe on behalf of `owner`; see [`unsubscribe_owner`](Self::unsubscribe_owner).
    pub async fn subscribe_owned(
        &self,
        topic: &str,
        handler: BoxMessageHandler,
        owner: &str,
    ) -> Subscription {
        self.insert(topic, handler, Some(owner.to_string())).await
    }

    async fn insert(
        &self,
        topic: &str,
        handler: BoxMessageHandler,
        owner: Option<String>,
    ) -> Subscription {
        let id = SubscriptionId(Uuid::new_v4());
        self.inner
            .topics
            .write()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(Arc::new(Subscriber { id, owner, handler }));
        tracing::debug!(topic = %topic, subscription = %id, "Subscribed");
        Subscription {
            id,
            topic: topic.to_string(),
            bus: Arc::downgrade(&self.inner),
        }
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.remove(None, id).await
    }

    pub async fn unsubscribe_owner(&self, owner: &str) -> usize {
        let mut topics = self.inner.topics.write().await;
        let mut removed = 0;
        for subs in topics.values_mut() {
            let before = subs.len();
            subs.retain(|s| s.owner.as_deref() != Some(owner));
            removed += before - subs.len();
        }
        topics.retain(|_, subs| !subs.is_empty());
        if removed > 0 {
            tracing::debug!(owner = %owner, removed, "Removed owned subscriptions");
        }
        removed
    }

    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.topics.read().await.get(topic).map_or(0, Vec::len)
    }

    pub async fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.inner.topics.read().await.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub async fn clear(&self) {
        self.inner.topics.write().await.clear();
    }

    /// Deliver `message` to every current subscriber of its topic.
    ///
    /// Subscribers run concurrently. Each one's error or panic is captured in
    /// the report; the call returns once every subscriber has been attempted.
    pub async fn publish(&self, message: Message) -> PublishReport {
        let subscribers: Vec<Arc<Subscriber>> = self
            .inner
            .topics
            .read()
            .await
            .get(&message.topic)
            .cloned()
            .unwrap_or_default();

        let span = match &self.inner.spans {
            Some(spans) => spans.publish_span(&message.topic, subscribers.len()),
            None => tracing::Span::none(),
        };

        let report = deliver(&message, subscribers)
            .instrument(span.clone())
            .await;

        span.record("failures", report.failures.len());
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_publish(report.delivered as u64, report.failures.len() as u64);
        }
        report
    }

    /// Publish on `target`'s direct channel.
    pub async fn send_message(
        &self,
        sender: &str,
        target: &str,
        kind: &str,
        payload: Value,
    ) -> PublishReport {
        self.publish(Message::direct(sender, target, kind, payload))
            .await
    }

    pub async fn broadcast_message(&self, sender: &str, kind: &str, payload: Value) -> PublishReport {
        self.publish(Message::broadcast(sender, kind, payload)).await
    }
}

async fn deliver(message: &Message, subscribers: Vec<Arc<Subscriber>>) -> PublishReport {
    let attempts = subscribers.iter().map(|sub| async move {
        let result = isolate(sub.handler.handle(message)).await;
        (sub, result)
    });

    let mut delivered = 0;
    let mut failures = Vec::new();
    for (sub, result) in join_all(attempts).await {
        match result {
            Ok(()) => delivered += 1,
            Err(fault) => {
                tracing::warn!(
                    topic = %message.topic,
                    message_id = %message.id,
                    subscription = %sub.id,
                    owner = sub.owner.as_deref().unwrap_or("-"),
                    error = %fault,
                    "Subscriber failed to handle message"
                );
                failures.push(MessageDeliveryError {
                    message_id: message.id,
                    topic: message.topic.clone(),
                    subscription: sub.id,
                    owner: sub.owner.clone(),
                    reason: fault.reason,
                    panicked: fault.panicked,
                });
            }
        }
    }

    PublishReport {
        message_id: message.id,
        topic: message.topic.clone(),
        delivered,
        failures,
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus").finish_non_exhaustive()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping it leaves the subscription in place; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns false if it was already removed or the bus is gone.
    pub async fn unsubscribe(self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => inner.remove(Some(&self.topic), self.id).await,
            None => false,
        }
    }
}

impl fmt::Debug for BusInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusInner").finish_non_exhaustive()
    }
}
