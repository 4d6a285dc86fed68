//! Fundamental types for the anchor relay.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: record references, ledger-write status, and the queue topic
//! naming convention.

pub mod record;
pub mod status;
pub mod topic;

pub use record::RecordRef;
pub use status::LedgerStatus;
pub use topic::work_topic;
