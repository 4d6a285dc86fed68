//! In-memory record store with scriptable failures.

use anchor_store::{RecordStore, StoreError};
use anchor_types::LedgerStatus;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// The two worker-owned fields of one record.
#[derive(Clone, Debug, Default)]
struct StatusEntry {
    status: Option<LedgerStatus>,
    result: Option<Value>,
}

/// One observed `set_status` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetCall {
    pub collection: String,
    pub record_id: String,
    pub status: LedgerStatus,
    pub with_result: bool,
}

/// A deterministic [`RecordStore`] backed by a map.
///
/// Reads of unknown records behave as "record exists, no status recorded".
/// Failures only happen when scripted via [`fail_next_gets`](Self::fail_next_gets)
/// / [`fail_next_sets`](Self::fail_next_sets), which burn down one induced
/// failure per call.
pub struct MemoryRecordStore {
    records: Mutex<HashMap<(String, String), StatusEntry>>,
    failing_gets: AtomicUsize,
    failing_sets: AtomicUsize,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
    set_log: Mutex<Vec<SetCall>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failing_gets: AtomicUsize::new(0),
            failing_sets: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
            set_log: Mutex::new(Vec::new()),
        }
    }

    /// Preset a record's status without going through the trait (and
    /// without counting as a call).
    pub fn seed_status(&self, collection: &str, record_id: &str, status: LedgerStatus) {
        let mut records = self.records.lock().unwrap();
        let entry = records
            .entry((collection.to_string(), record_id.to_string()))
            .or_default();
        entry.status = Some(status);
    }

    /// Make the next `n` reads fail with a backend error.
    pub fn fail_next_gets(&self, n: usize) {
        self.failing_gets.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` writes fail with a backend error.
    pub fn fail_next_sets(&self, n: usize) {
        self.failing_sets.store(n, Ordering::SeqCst);
    }

    /// Current status of a record, bypassing the trait.
    pub fn status_of(&self, collection: &str, record_id: &str) -> Option<LedgerStatus> {
        let records = self.records.lock().unwrap();
        records
            .get(&(collection.to_string(), record_id.to_string()))
            .and_then(|e| e.status)
    }

    /// Current result blob of a record, bypassing the trait.
    pub fn result_of(&self, collection: &str, record_id: &str) -> Option<Value> {
        let records = self.records.lock().unwrap();
        records
            .get(&(collection.to_string(), record_id.to_string()))
            .and_then(|e| e.result.clone())
    }

    /// Number of `get_status` calls observed.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `set_status` calls observed.
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    /// Every observed `set_status` call in order, including failed ones.
    pub fn set_history(&self) -> Vec<SetCall> {
        self.set_log.lock().unwrap().clone()
    }

    /// Consume one induced failure if any are scripted.
    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_status(
        &self,
        collection: &str,
        record_id: &str,
    ) -> Result<Option<LedgerStatus>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_gets) {
            return Err(StoreError::Backend("induced read failure".into()));
        }
        Ok(self.status_of(collection, record_id))
    }

    async fn set_status(
        &self,
        collection: &str,
        record_id: &str,
        status: LedgerStatus,
        result: Option<&Value>,
    ) -> Result<(), StoreError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.set_log.lock().unwrap().push(SetCall {
            collection: collection.to_string(),
            record_id: record_id.to_string(),
            status,
            with_result: result.is_some(),
        });
        if Self::take_failure(&self.failing_sets) {
            return Err(StoreError::Backend("induced write failure".into()));
        }
        let mut records = self.records.lock().unwrap();
        let entry = records
            .entry((collection.to_string(), record_id.to_string()))
            .or_default();
        entry.status = Some(status);
        if let Some(result) = result {
            entry.result = Some(result.clone());
        }
        Ok(())
    }
}
