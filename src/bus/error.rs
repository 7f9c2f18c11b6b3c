//! Delivery failures and publish outcomes.

use serde::Serialize;

use super::{MessageId, SubscriptionId};

/// One subscriber failed to handle a message. Siblings were unaffected.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("delivery of {message_id} on '{topic}' to subscriber {subscription} failed: {reason}")]
pub struct MessageDeliveryError {
    pub message_id: MessageId,
    pub topic: String,
    pub subscription: SubscriptionId,
    pub owner: Option<String>,
    pub reason: String,
    pub panicked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub message_id: MessageId,
    pub topic: String,
    pub delivered: usize,
    pub failures: Vec<MessageDeliveryError>,
}

impl PublishReport {
    /// Subscribers that were attempted.
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
