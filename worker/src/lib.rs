//! The anchor worker — bridges a message queue to an external ledger.
//!
//! The worker consumes record references from a deployment-scoped topic,
//! reconciles each record's stored ledger status, submits unclaimed records
//! to the ledger adapter, and acknowledges or redelivers the queue message
//! based on the outcome. At-least-once delivery plus the claim protocol
//! converge every record to a terminal status across redeliveries and
//! process restarts.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod worker;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use logging::{init_logging, LogFormat};
pub use metrics::WorkerMetrics;
pub use worker::{enqueue_record, Worker};
