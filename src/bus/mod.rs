//! Message bus.
//!
//! Plain topics plus two conventions layered on top: a direct channel per
//! plugin (`plugin:message:<name>`) and a broadcast channel
//! (`plugin:broadcast`). Lifecycle events are published here as well.

mod broker;
mod error;
mod handler;
mod message;

pub use broker::{MessageBus, Subscription, SubscriptionId};
pub use error::{MessageDeliveryError, PublishReport};
pub use handler::{
    AsyncFnHandler, BoxMessageHandler, FnHandler, MessageHandler, async_handler_fn, handler_fn,
};
pub use message::{
    ACTIVATED_TOPIC, BROADCAST_TOPIC, DEACTIVATED_TOPIC, DIRECT_TOPIC_PREFIX, Message, MessageId,
    direct_topic,
};
