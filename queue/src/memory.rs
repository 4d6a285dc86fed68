//! In-process broker for standalone operation and tests.

use crate::{Delivery, Disposition, MessageHandler, MessageQueue, QueueError, Subscription};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};

/// A minimal in-process broker: per-topic FIFO queues, one dispatch task
/// per subscriber, sequential delivery per subscriber.
///
/// A nacked (or dropped-unresolved) delivery returns the message to the
/// front of its topic queue for immediate redelivery; throttling repeated
/// failures is the consumer's concern. Messages published before any
/// subscriber exists are buffered until one arrives.
pub struct MemoryQueue {
    topics: Mutex<HashMap<String, Arc<TopicState>>>,
}

struct TopicState {
    messages: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Number of messages currently buffered on a topic (in-flight
    /// deliveries excluded).
    pub fn depth(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .expect("topic map poisoned")
            .get(topic)
            .map(|t| t.messages.lock().expect("topic queue poisoned").len())
            .unwrap_or(0)
    }

    fn topic(&self, name: &str) -> Arc<TopicState> {
        let mut topics = self.topics.lock().expect("topic map poisoned");
        Arc::clone(topics.entry(name.to_string()).or_insert_with(|| {
            Arc::new(TopicState {
                messages: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
            })
        }))
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        let topic = self.topic(topic);
        topic
            .messages
            .lock()
            .expect("topic queue poisoned")
            .push_back(payload);
        topic.notify.notify_one();
        Ok(())
    }

    async fn consume(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Subscription, QueueError> {
        let topic = self.topic(topic);
        let (stop_tx, stop_rx) = watch::channel(false);

        tokio::spawn(dispatch(topic, handler, stop_rx));

        Ok(Subscription::new(move || {
            let _ = stop_tx.send(true);
        }))
    }
}

/// Per-subscriber delivery loop. One message at a time: pop, hand to the
/// handler, await its disposition, requeue on nack.
async fn dispatch(
    topic: Arc<TopicState>,
    handler: Arc<dyn MessageHandler>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        if *stop.borrow() {
            return;
        }

        let message = {
            let mut queue = topic.messages.lock().expect("topic queue poisoned");
            queue.pop_front()
        };
        let Some(message) = message else {
            tokio::select! {
                _ = topic.notify.notified() => {}
                _ = stop.changed() => {}
            }
            continue;
        };

        let (delivery, disposition) = Delivery::new();
        handler.handle(message.clone(), delivery).await;

        match disposition.await {
            Ok(Disposition::Ack) => {}
            Ok(Disposition::Nack) | Err(_) => {
                tracing::debug!(
                    bytes = message.len(),
                    "delivery not acknowledged, requeueing"
                );
                topic
                    .messages
                    .lock()
                    .expect("topic queue poisoned")
                    .push_front(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const RECV_TIMEOUT: Duration = Duration::from_secs(1);

    /// Handler that reports every delivery and resolves it with the next
    /// scripted disposition (default ack).
    struct Recorder {
        dispositions: Mutex<VecDeque<Disposition>>,
        delivered: mpsc::UnboundedSender<Vec<u8>>,
    }

    impl Recorder {
        fn new(dispositions: Vec<Disposition>) -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<u8>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    dispositions: Mutex::new(dispositions.into()),
                    delivered: tx,
                }),
                rx,
            )
        }
    }

    #[async_trait]
    impl MessageHandler for Recorder {
        async fn handle(&self, payload: Vec<u8>, delivery: Delivery) {
            let disposition = self
                .dispositions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Disposition::Ack);
            let _ = self.delivered.send(payload);
            match disposition {
                Disposition::Ack => delivery.ack(),
                Disposition::Nack => delivery.nack(),
            }
        }
    }

    #[tokio::test]
    async fn publish_reaches_a_subscriber() {
        let queue = MemoryQueue::new();
        let (handler, mut delivered) = Recorder::new(vec![]);
        let _sub = queue.consume("work", handler).await.unwrap();

        queue.publish("work", b"hello".to_vec()).await.unwrap();

        let payload = timeout(RECV_TIMEOUT, delivered.recv()).await.unwrap();
        assert_eq!(payload, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn messages_published_before_consume_are_buffered() {
        let queue = MemoryQueue::new();
        queue.publish("work", b"early".to_vec()).await.unwrap();
        assert_eq!(queue.depth("work"), 1);

        let (handler, mut delivered) = Recorder::new(vec![]);
        let _sub = queue.consume("work", handler).await.unwrap();

        let payload = timeout(RECV_TIMEOUT, delivered.recv()).await.unwrap();
        assert_eq!(payload, Some(b"early".to_vec()));
    }

    #[tokio::test]
    async fn ack_removes_the_message() {
        let queue = MemoryQueue::new();
        let (handler, mut delivered) = Recorder::new(vec![Disposition::Ack]);
        let _sub = queue.consume("work", handler).await.unwrap();

        queue.publish("work", b"once".to_vec()).await.unwrap();
        timeout(RECV_TIMEOUT, delivered.recv()).await.unwrap();

        // No redelivery follows an ack.
        assert!(timeout(Duration::from_millis(100), delivered.recv())
            .await
            .is_err());
        assert_eq!(queue.depth("work"), 0);
    }

    #[tokio::test]
    async fn nack_redelivers_the_same_message() {
        let queue = MemoryQueue::new();
        let (handler, mut delivered) =
            Recorder::new(vec![Disposition::Nack, Disposition::Ack]);
        let _sub = queue.consume("work", handler).await.unwrap();

        queue.publish("work", b"again".to_vec()).await.unwrap();

        let first = timeout(RECV_TIMEOUT, delivered.recv()).await.unwrap();
        let second = timeout(RECV_TIMEOUT, delivered.recv()).await.unwrap();
        assert_eq!(first, Some(b"again".to_vec()));
        assert_eq!(second, Some(b"again".to_vec()));
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let queue = MemoryQueue::new();
        let (handler, mut delivered) = Recorder::new(vec![]);
        let sub = queue.consume("work", handler).await.unwrap();
        sub.unsubscribe();

        queue.publish("work", b"late".to_vec()).await.unwrap();
        assert!(timeout(Duration::from_millis(100), delivered.recv())
            .await
            .is_err());
        // The message stays buffered for a future subscriber.
        assert_eq!(queue.depth("work"), 1);
    }

    #[tokio::test]
    async fn topics_are_independent() {
        let queue = MemoryQueue::new();
        let (handler_a, mut delivered_a) = Recorder::new(vec![]);
        let (handler_b, mut delivered_b) = Recorder::new(vec![]);
        let _sub_a = queue.consume("topic-a", handler_a).await.unwrap();
        let _sub_b = queue.consume("topic-b", handler_b).await.unwrap();

        queue.publish("topic-a", b"for-a".to_vec()).await.unwrap();

        let payload = timeout(RECV_TIMEOUT, delivered_a.recv()).await.unwrap();
        assert_eq!(payload, Some(b"for-a".to_vec()));
        assert!(timeout(Duration::from_millis(100), delivered_b.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn fifo_order_within_a_topic() {
        let queue = MemoryQueue::new();
        let (handler, mut delivered) = Recorder::new(vec![]);
        let _sub = queue.consume("work", handler).await.unwrap();

        queue.publish("work", b"1".to_vec()).await.unwrap();
        queue.publish("work", b"2".to_vec()).await.unwrap();
        queue.publish("work", b"3".to_vec()).await.unwrap();

        for expected in [b"1", b"2", b"3"] {
            let payload = timeout(RECV_TIMEOUT, delivered.recv()).await.unwrap();
            assert_eq!(payload, Some(expected.to_vec()));
        }
    }
}
