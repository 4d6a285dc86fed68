//! Ledger adapter interface.
//!
//! The ledger is the external write-once service records are ultimately
//! submitted to (a distributed ledger or blockchain endpoint). Network
//! clients live outside this workspace; the worker depends only on the
//! [`LedgerAdapter`] trait defined here.

pub mod adapter;
pub mod error;

pub use adapter::LedgerAdapter;
pub use error::LedgerError;
