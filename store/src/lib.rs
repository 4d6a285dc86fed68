//! Abstract record-store access for the anchor relay.
//!
//! The worker reads and writes exactly two fields on an application record:
//! its ledger status and the opaque ledger result. Every backend (the
//! application's data store in production, an in-memory map for testing)
//! implements this trait; the rest of the workspace depends only on the
//! trait.

pub mod error;
pub mod record_store;

pub use error::StoreError;
pub use record_store::RecordStore;
