//! Ledger submission trait.

use crate::LedgerError;
use anchor_types::RecordRef;
use async_trait::async_trait;
use serde_json::Value;

/// Client-side view of the external ledger service.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Initiate a new ledger write for a record, returning the ledger's
    /// result payload on success.
    ///
    /// The adapter gives no idempotency guarantee: calling this twice for
    /// the same record may produce duplicate ledger entries. The worker's
    /// claim protocol is what prevents repeated calls.
    async fn send(&self, record: &RecordRef) -> Result<Value, LedgerError>;

    /// Fetch the result of a previously initiated write.
    ///
    /// Returns [`LedgerError::NotFound`] when no submission for this record
    /// exists, which distinguishes "nothing was ever submitted" from a
    /// genuinely failing fetch.
    async fn get(&self, collection: &str, record_id: &str) -> Result<Value, LedgerError>;
}
