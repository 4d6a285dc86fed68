//! Record status storage trait.

use crate::StoreError;
use anchor_types::LedgerStatus;
use async_trait::async_trait;
use serde_json::Value;

/// Read/write access to the ledger-status fields of application records.
///
/// Both fields are absent until the worker first writes them; `set_status`
/// has upsert semantics and creates them when missing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the current ledger status of a record.
    ///
    /// `Ok(None)` means the record exists but no status has ever been
    /// recorded for it.
    async fn get_status(
        &self,
        collection: &str,
        record_id: &str,
    ) -> Result<Option<LedgerStatus>, StoreError>;

    /// Write a record's ledger status and, when present, the ledger result
    /// blob alongside it.
    async fn set_status(
        &self,
        collection: &str,
        record_id: &str,
        status: LedgerStatus,
        result: Option<&Value>,
    ) -> Result<(), StoreError>;
}
