//! Nullable collaborators for deterministic testing.
//!
//! The worker's external dependencies (record store, ledger) are abstracted
//! behind traits. This crate provides implementations that return scripted
//! values, count their calls, and never touch a network or a disk.
//!
//! Usage: swap the real clients for nullables in tests.

pub mod ledger;
pub mod store;

pub use ledger::NullLedger;
pub use store::{MemoryRecordStore, SetCall};
