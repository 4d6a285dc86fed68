//! Broker-facing traits.

use crate::{Delivery, QueueError};
use async_trait::async_trait;
use std::sync::Arc;

/// Receives messages delivered on a subscribed topic.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one delivered message.
    ///
    /// The handler owns the delivery handle and must resolve it; dropping
    /// it unresolved counts as a nack.
    async fn handle(&self, payload: Vec<u8>, delivery: Delivery);
}

/// A message broker the worker can publish to and consume from.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Publish a message to a topic.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Subscribe a handler to a topic.
    ///
    /// Delivery starts immediately and lasts until the returned
    /// subscription is unsubscribed or dropped.
    async fn consume(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Subscription, QueueError>;
}

/// Handle for an active topic subscription.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap the broker-specific cancellation action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop delivering messages to this subscription's handler.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
