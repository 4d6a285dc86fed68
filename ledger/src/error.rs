use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// No submission exists for the requested record.
    #[error("no ledger entry for {collection}/{record_id}")]
    NotFound {
        collection: String,
        record_id: String,
    },

    /// The ledger rejected or failed a submission.
    #[error("ledger submission failed: {0}")]
    Submit(String),

    /// A result fetch failed for a reason other than absence.
    #[error("ledger fetch failed: {0}")]
    Fetch(String),
}

impl LedgerError {
    pub fn not_found(collection: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            record_id: record_id.into(),
        }
    }

    /// Whether this error is the absence sentinel rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
