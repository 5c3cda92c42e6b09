//! Bus transport port: publish/subscribe on the message bus.

use std::future::Future;
use std::sync::Arc;

use hkbridge_domain::error::{PublishError, SubscribeError};

/// Callback invoked with `(topic, payload)` for every message received on a
/// subscribed topic.
///
/// Handlers run on the transport's receive loop and must not block.
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Publish/subscribe transport. Delivery is "at most once" throughout.
pub trait BusTransport: Send + Sync {
    /// Queue `payload` for delivery on `topic` without waiting for the
    /// broker.
    ///
    /// `retained` asks the broker to keep the message for late subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the transport cannot accept the message.
    fn publish(&self, topic: &str, payload: Vec<u8>, retained: bool) -> Result<(), PublishError>;

    /// Register `handler` for messages on `topic`.
    ///
    /// A topic may only be subscribed once at a time.
    fn subscribe(
        &self,
        topic: &str,
        handler: MessageHandler,
    ) -> impl Future<Output = Result<(), SubscribeError>> + Send;

    /// Drop the subscription on `topic` and its handler.
    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<(), SubscribeError>> + Send;
}
