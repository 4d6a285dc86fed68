//! Ledger-write status of a record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of one record's ledger write.
///
/// The absence of a status (`None` at the store level) means the record has
/// never been picked up. `Sending` is an advisory claim observed by polling,
/// not a hard lock: concurrent writers to the same record are not
/// synchronized through it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    /// A submission is in flight (or was abandoned mid-flight).
    Sending,
    /// The ledger accepted the record.
    Sent,
    /// The ledger rejected the record. Terminal unless the status is
    /// externally reset.
    Failed,
}

impl LedgerStatus {
    /// Whether this status ends the record's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
