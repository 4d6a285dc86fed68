//! Nullable ledger adapter — scripted outcomes, call counting.

use anchor_ledger::{LedgerAdapter, LedgerError};
use anchor_types::RecordRef;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A deterministic [`LedgerAdapter`].
///
/// Outcomes are scripted per call via [`enqueue_send`](Self::enqueue_send)
/// and [`enqueue_get`](Self::enqueue_get); when the script runs out, `send`
/// succeeds with a canned receipt and `get` reports not-found (the natural
/// state of a ledger nothing was ever submitted to).
pub struct NullLedger {
    send_outcomes: Mutex<VecDeque<Result<Value, LedgerError>>>,
    get_outcomes: Mutex<VecDeque<Result<Value, LedgerError>>>,
    send_calls: AtomicUsize,
    get_calls: AtomicUsize,
    sent: Mutex<Vec<RecordRef>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            send_outcomes: Mutex::new(VecDeque::new()),
            get_outcomes: Mutex::new(VecDeque::new()),
            send_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Script the outcome of the next unscripted `send` call.
    pub fn enqueue_send(&self, outcome: Result<Value, LedgerError>) {
        self.send_outcomes.lock().unwrap().push_back(outcome);
    }

    /// Script the outcome of the next unscripted `get` call.
    pub fn enqueue_get(&self, outcome: Result<Value, LedgerError>) {
        self.get_outcomes.lock().unwrap().push_back(outcome);
    }

    /// Number of `send` calls observed.
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Number of `get` calls observed.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Every record passed to `send`, in call order.
    pub fn sent_records(&self) -> Vec<RecordRef> {
        self.sent.lock().unwrap().clone()
    }

    /// The canned receipt used when no `send` outcome is scripted.
    pub fn default_receipt() -> Value {
        json!({ "receipt": "null-ledger" })
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerAdapter for NullLedger {
    async fn send(&self, record: &RecordRef) -> Result<Value, LedgerError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(record.clone());
        self.send_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::default_receipt()))
    }

    async fn get(&self, collection: &str, record_id: &str) -> Result<Value, LedgerError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.get_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LedgerError::not_found(collection, record_id)))
    }
}
