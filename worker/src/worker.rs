//! The per-message reconciliation state machine.
//!
//! One queue message describes one record that may need a ledger write.
//! Handling walks the sequence: backoff gate → decode → status poll →
//! recover-or-claim → submit → persist, acknowledging the message once the
//! record has converged and negative-acknowledging when a collaborator
//! failure makes queue redelivery the right recovery.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use anchor_ledger::LedgerAdapter;
use anchor_queue::{Delivery, MemoryQueue, MessageHandler, MessageQueue, QueueError, Subscription};
use anchor_store::RecordStore;
use anchor_types::{work_topic, LedgerStatus, RecordRef};

use crate::{WorkerConfig, WorkerError, WorkerMetrics};

/// Queue-facing disposition of one handled message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Completion {
    /// Fully handled; remove the message from the queue.
    Ack,
    /// Handling failed; leave redelivery to the queue.
    Nack,
}

/// Durable background worker bridging the message queue to the ledger.
///
/// Created empty, wired up exactly once via [`initialize`](Self::initialize),
/// then consuming for the rest of the process lifetime. There is no
/// destruction path other than process exit.
pub struct Worker {
    config: WorkerConfig,
    store: Arc<dyn RecordStore>,
    metrics: Arc<WorkerMetrics>,
    initialized: AtomicBool,
    pipeline: Mutex<Option<Arc<Pipeline>>>,
    /// Held for the process lifetime; dropping it would unsubscribe.
    _subscription: Mutex<Option<Subscription>>,
}

impl Worker {
    /// Create a worker bound to a record store. No messages flow until
    /// [`initialize`](Self::initialize) wires the remaining collaborators.
    pub fn new(config: WorkerConfig, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config,
            store,
            metrics: Arc::new(WorkerMetrics::new()),
            initialized: AtomicBool::new(false),
            pipeline: Mutex::new(None),
            _subscription: Mutex::new(None),
        }
    }

    /// Wire the worker to its ledger adapter and queue and begin consuming
    /// the deployment's work topic.
    ///
    /// When `queue` is `None` an in-process [`MemoryQueue`] is constructed,
    /// suitable for standalone operation and tests. Initialization is
    /// strictly once-only; a second call fails with
    /// [`WorkerError::AlreadyInitialized`].
    pub async fn initialize(
        &self,
        ledger: Arc<dyn LedgerAdapter>,
        queue: Option<Arc<dyn MessageQueue>>,
    ) -> Result<(), WorkerError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::AlreadyInitialized);
        }

        let queue = queue.unwrap_or_else(|| Arc::new(MemoryQueue::new()));
        let pipeline = Arc::new(Pipeline {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            ledger,
            metrics: Arc::clone(&self.metrics),
            failure_streak: AtomicU32::new(0),
        });

        let topic = work_topic(&self.config.app_id);
        let handler = Arc::new(RecordMessageHandler {
            pipeline: Arc::clone(&pipeline),
        });
        let subscription = queue.consume(&topic, handler).await?;
        tracing::info!(topic = %topic, "anchor worker consuming");

        *self.pipeline.lock().expect("pipeline lock poisoned") = Some(pipeline);
        *self._subscription.lock().expect("subscription lock poisoned") = Some(subscription);
        Ok(())
    }

    /// Consecutive fully-failed handlings (the backoff gate input). Zero
    /// before initialization and after any fully successful handling.
    pub fn failure_streak(&self) -> u32 {
        self.pipeline
            .lock()
            .expect("pipeline lock poisoned")
            .as_ref()
            .map(|p| p.failure_streak.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// This worker's metrics (the deployment owns the scrape endpoint).
    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// Publish a record reference onto a deployment's work topic.
///
/// The producer half of the bridge: call this when a record needs a ledger
/// write; a worker initialized with the same `app_id` will pick it up.
pub async fn enqueue_record(
    queue: &dyn MessageQueue,
    app_id: &str,
    record: &RecordRef,
) -> Result<(), QueueError> {
    queue.publish(&work_topic(app_id), record.to_wire()).await
}

/// Queue-facing adapter: maps the state machine's completion onto the
/// delivery handle.
struct RecordMessageHandler {
    pipeline: Arc<Pipeline>,
}

#[async_trait]
impl MessageHandler for RecordMessageHandler {
    async fn handle(&self, payload: Vec<u8>, delivery: Delivery) {
        match self.pipeline.handle_message(&payload).await {
            Completion::Ack => {
                self.pipeline.metrics.messages_acked.inc();
                delivery.ack();
            }
            Completion::Nack => {
                self.pipeline.metrics.messages_nacked.inc();
                delivery.nack();
            }
        }
    }
}

/// Shared collaborators and mutable state for message handling.
struct Pipeline {
    config: WorkerConfig,
    store: Arc<dyn RecordStore>,
    ledger: Arc<dyn LedgerAdapter>,
    metrics: Arc<WorkerMetrics>,
    /// Consecutive fully-failed handlings across all records. A single
    /// per-worker counter: one record's failures throttle every record's
    /// next handling.
    failure_streak: AtomicU32,
}

impl Pipeline {
    /// Handle one queue message end to end, returning the disposition the
    /// queue should apply.
    async fn handle_message(&self, payload: &[u8]) -> Completion {
        self.metrics.messages_handled.inc();

        // Backoff gate: each consecutive fully-failed handling lengthens
        // the pause before the next message is touched.
        let streak = self.failure_streak.load(Ordering::SeqCst);
        if streak > 0 {
            tokio::time::sleep(self.config.failure_backoff_unit() * streak).await;
        }

        let record = match RecordRef::from_wire(payload) {
            Ok(record) => record,
            Err(e) => {
                // Redelivery can never fix a malformed payload; drop it.
                tracing::error!(error = %e, "discarding malformed queue message");
                return Completion::Ack;
            }
        };

        self.reconcile(&record).await
    }

    /// Reconcile one record: poll its status, recover or claim, submit,
    /// persist.
    async fn reconcile(&self, record: &RecordRef) -> Completion {
        let collection = record.collection.as_str();
        let record_id = record.record_id.as_str();

        // Poll while another attempt looks in flight. Leaving the loop
        // with `in_flight` still set means the bound expired and the
        // claim is treated as abandoned.
        let mut in_flight = false;
        for _ in 0..self.config.status_poll_limit {
            let status = match self.store.get_status(collection, record_id).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::error!(collection = %collection, record_id = %record_id, error = %e,
                        "could not read record status");
                    return self.handling_failed();
                }
            };

            match status {
                None => {
                    in_flight = false;
                    break;
                }
                Some(LedgerStatus::Sending) => {
                    tracing::warn!(collection = %collection, record_id = %record_id,
                        "record already marked sending, waiting for the other attempt");
                    in_flight = true;
                    tokio::time::sleep(self.config.status_poll_interval()).await;
                }
                Some(resolved) => {
                    tracing::warn!(collection = %collection, record_id = %record_id,
                        status = %resolved, "record already resolved, nothing to do");
                    self.reset_streak();
                    return Completion::Ack;
                }
            }
        }

        // Recover the result of a presumed-existing submission.
        let mut recovered = None;
        if in_flight {
            match self.ledger.get(collection, record_id).await {
                Ok(result) => recovered = Some(result),
                Err(e) if e.is_not_found() => {
                    // Nothing was ever submitted: the claim is stale and
                    // the record is fresh work after all.
                }
                Err(e) => {
                    tracing::error!(collection = %collection, record_id = %record_id, error = %e,
                        "could not fetch ledger result");
                    return self.handling_failed();
                }
            }
        }

        let (final_status, result) = if let Some(result) = recovered {
            self.metrics.records_recovered.inc();
            (LedgerStatus::Sent, result)
        } else {
            // Claim the record before submitting so a concurrent delivery
            // observes `sending` instead of double-submitting.
            if let Err(e) = self
                .store
                .set_status(collection, record_id, LedgerStatus::Sending, None)
                .await
            {
                tracing::error!(collection = %collection, record_id = %record_id, error = %e,
                    "could not claim record");
                return self.handling_failed();
            }

            match self.ledger.send(record).await {
                Ok(result) => {
                    self.metrics.records_submitted.inc();
                    (LedgerStatus::Sent, result)
                }
                Err(e) => {
                    // A rejected submission is terminal for the record;
                    // only an external status reset reopens it.
                    tracing::error!(collection = %collection, record_id = %record_id, error = %e,
                        "ledger rejected record");
                    self.metrics.records_failed.inc();
                    (LedgerStatus::Failed, json!({ "error": e.to_string() }))
                }
            }
        };

        // Persist the outcome. The ledger action already happened, so a
        // failed write is logged and the message still acknowledged; a
        // redelivery here would repeat the submission.
        match self
            .store
            .set_status(collection, record_id, final_status, Some(&result))
            .await
        {
            Ok(()) => self.reset_streak(),
            Err(e) => {
                tracing::error!(collection = %collection, record_id = %record_id,
                    status = %final_status, error = %e,
                    "could not persist final record status");
                self.bump_streak();
            }
        }

        Completion::Ack
    }

    /// A collaborator failure ended this handling: lengthen the backoff
    /// gate and leave the message to queue redelivery.
    fn handling_failed(&self) -> Completion {
        self.bump_streak();
        Completion::Nack
    }

    fn bump_streak(&self) {
        let streak = self.failure_streak.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.failure_streak.set(i64::from(streak));
    }

    fn reset_streak(&self) {
        self.failure_streak.store(0, Ordering::SeqCst);
        self.metrics.failure_streak.set(0);
    }
}
