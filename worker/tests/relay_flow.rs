//! End-to-end flows through the worker and the in-process broker: publish a
//! record reference, let the worker consume it, observe the store and the
//! ledger converge.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use anchor_ledger::LedgerAdapter;
use anchor_nullables::{MemoryRecordStore, NullLedger};
use anchor_queue::{MemoryQueue, MessageQueue};
use anchor_store::RecordStore;
use anchor_types::{LedgerStatus, RecordRef};
use anchor_worker::{enqueue_record, Worker, WorkerConfig};

fn test_config(app_id: &str) -> WorkerConfig {
    WorkerConfig {
        app_id: app_id.into(),
        status_poll_limit: 3,
        status_poll_interval_ms: 1,
        failure_backoff_unit_ms: 1,
        ..Default::default()
    }
}

/// Poll until `cond` holds or a two-second deadline passes.
async fn wait_for(cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn invoice(record_id: &str) -> RecordRef {
    let mut record = RecordRef::new("Invoice", record_id);
    record.payload.insert("amount".into(), json!(125));
    record
}

#[tokio::test]
async fn published_record_converges_to_sent() {
    let store = Arc::new(MemoryRecordStore::new());
    let ledger = Arc::new(NullLedger::new());
    let queue = Arc::new(MemoryQueue::new());

    let worker = Worker::new(
        test_config("flow"),
        Arc::clone(&store) as Arc<dyn RecordStore>,
    );
    worker
        .initialize(
            Arc::clone(&ledger) as Arc<dyn LedgerAdapter>,
            Some(Arc::clone(&queue) as Arc<dyn MessageQueue>),
        )
        .await
        .unwrap();

    enqueue_record(queue.as_ref(), "flow", &invoice("abc"))
        .await
        .unwrap();

    wait_for(|| store.status_of("Invoice", "abc") == Some(LedgerStatus::Sent)).await;
    assert_eq!(ledger.send_calls(), 1);
    assert_eq!(ledger.sent_records(), vec![invoice("abc")]);

    // The message was acked: nothing left to deliver, nothing re-sent.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ledger.send_calls(), 1);
    let metrics = worker.metrics();
    assert_eq!(metrics.messages_acked.get(), 1);
    assert_eq!(metrics.messages_nacked.get(), 0);
}

#[tokio::test]
async fn transient_store_failures_are_retried_via_redelivery() {
    let store = Arc::new(MemoryRecordStore::new());
    let ledger = Arc::new(NullLedger::new());
    let queue = Arc::new(MemoryQueue::new());

    let worker = Worker::new(
        test_config("retry"),
        Arc::clone(&store) as Arc<dyn RecordStore>,
    );
    worker
        .initialize(
            Arc::clone(&ledger) as Arc<dyn LedgerAdapter>,
            Some(Arc::clone(&queue) as Arc<dyn MessageQueue>),
        )
        .await
        .unwrap();

    // The first two status reads fail; the third delivery succeeds.
    store.fail_next_gets(2);
    enqueue_record(queue.as_ref(), "retry", &invoice("abc"))
        .await
        .unwrap();

    wait_for(|| store.status_of("Invoice", "abc") == Some(LedgerStatus::Sent)).await;

    let metrics = worker.metrics();
    assert_eq!(metrics.messages_handled.get(), 3);
    assert_eq!(metrics.messages_nacked.get(), 2);
    assert_eq!(metrics.messages_acked.get(), 1);
    assert_eq!(ledger.send_calls(), 1);
    // The successful handling reset the backoff streak.
    assert_eq!(worker.failure_streak(), 0);
}

#[tokio::test]
async fn redelivered_message_for_a_sent_record_is_idempotent() {
    let store = Arc::new(MemoryRecordStore::new());
    let ledger = Arc::new(NullLedger::new());
    let queue = Arc::new(MemoryQueue::new());

    let worker = Worker::new(
        test_config("idem"),
        Arc::clone(&store) as Arc<dyn RecordStore>,
    );
    worker
        .initialize(
            Arc::clone(&ledger) as Arc<dyn LedgerAdapter>,
            Some(Arc::clone(&queue) as Arc<dyn MessageQueue>),
        )
        .await
        .unwrap();

    enqueue_record(queue.as_ref(), "idem", &invoice("abc"))
        .await
        .unwrap();
    wait_for(|| store.status_of("Invoice", "abc") == Some(LedgerStatus::Sent)).await;

    // A duplicate delivery of the same record reference.
    enqueue_record(queue.as_ref(), "idem", &invoice("abc"))
        .await
        .unwrap();
    let metrics = worker.metrics();
    wait_for(|| metrics.messages_acked.get() == 2).await;

    assert_eq!(ledger.send_calls(), 1);
}

#[tokio::test]
async fn rejected_submission_ends_failed_without_redelivery() {
    let store = Arc::new(MemoryRecordStore::new());
    let ledger = Arc::new(NullLedger::new());
    let queue = Arc::new(MemoryQueue::new());

    let worker = Worker::new(
        test_config("reject"),
        Arc::clone(&store) as Arc<dyn RecordStore>,
    );
    worker
        .initialize(
            Arc::clone(&ledger) as Arc<dyn LedgerAdapter>,
            Some(Arc::clone(&queue) as Arc<dyn MessageQueue>),
        )
        .await
        .unwrap();

    ledger.enqueue_send(Err(anchor_ledger::LedgerError::Submit(
        "invalid payload".into(),
    )));
    enqueue_record(queue.as_ref(), "reject", &invoice("abc"))
        .await
        .unwrap();

    wait_for(|| store.status_of("Invoice", "abc") == Some(LedgerStatus::Failed)).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    // Terminal: exactly one submission attempt, message acked.
    assert_eq!(ledger.send_calls(), 1);
    let metrics = worker.metrics();
    assert_eq!(metrics.messages_acked.get(), 1);
    assert_eq!(metrics.messages_nacked.get(), 0);
    assert_eq!(metrics.records_failed.get(), 1);
}

#[tokio::test]
async fn workers_on_different_app_ids_do_not_cross_consume() {
    let store_a = Arc::new(MemoryRecordStore::new());
    let store_b = Arc::new(MemoryRecordStore::new());
    let ledger_a = Arc::new(NullLedger::new());
    let ledger_b = Arc::new(NullLedger::new());
    let queue = Arc::new(MemoryQueue::new());

    let worker_a = Worker::new(
        test_config("app-a"),
        Arc::clone(&store_a) as Arc<dyn RecordStore>,
    );
    worker_a
        .initialize(
            Arc::clone(&ledger_a) as Arc<dyn LedgerAdapter>,
            Some(Arc::clone(&queue) as Arc<dyn MessageQueue>),
        )
        .await
        .unwrap();

    let worker_b = Worker::new(
        test_config("app-b"),
        Arc::clone(&store_b) as Arc<dyn RecordStore>,
    );
    worker_b
        .initialize(
            Arc::clone(&ledger_b) as Arc<dyn LedgerAdapter>,
            Some(Arc::clone(&queue) as Arc<dyn MessageQueue>),
        )
        .await
        .unwrap();

    enqueue_record(queue.as_ref(), "app-a", &invoice("abc"))
        .await
        .unwrap();

    wait_for(|| store_a.status_of("Invoice", "abc") == Some(LedgerStatus::Sent)).await;
    assert_eq!(ledger_a.send_calls(), 1);
    assert_eq!(ledger_b.send_calls(), 0);
    assert_eq!(store_b.status_of("Invoice", "abc"), None);
}
