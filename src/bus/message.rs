//! Message envelope and topic conventions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Prefix of a plugin's direct channel: `plugin:message:<name>`.
pub const DIRECT_TOPIC_PREFIX: &str = "plugin:message:";
pub const BROADCAST_TOPIC: &str = "plugin:broadcast";
pub const ACTIVATED_TOPIC: &str = "plugin:activated";
pub const DEACTIVATED_TOPIC: &str = "plugin:deactivated";

pub fn direct_topic(target: &str) -> String {
    format!("{}{}", DIRECT_TOPIC_PREFIX, target)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A transient envelope. Id and timestamp are stamped when it is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender: String,
    /// `None` for broadcasts and plain topic publishes.
    pub target: Option<String>,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        topic: impl Into<String>,
        sender: impl Into<String>,
        kind: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender: sender.into(),
            target: None,
            topic: topic.into(),
            kind: kind.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn direct(
        sender: impl Into<String>,
        target: impl Into<String>,
        kind: impl Into<String>,
        payload: Value,
    ) -> Self {
        let target = target.into();
        let mut message = Self::new(direct_topic(&target), sender, kind, payload);
        message.target = Some(target);
        message
    }

    pub fn broadcast(sender: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
        Self::new(BROADCAST_TOPIC, sender, kind, payload)
    }

    pub fn is_broadcast(&self) -> bool {
        self.target.is_none()
    }
}
