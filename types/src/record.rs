//! Record references — the unit of work flowing through the queue.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The minimal identifying + payload data describing one record that needs
/// a ledger write.
///
/// On the wire this is a flat UTF-8 JSON object: the two identifying fields
/// plus every other field of the source record, carried verbatim into the
/// ledger submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordRef {
    /// Collection (class/table) the record lives in.
    pub collection: String,
    /// Unique id of the record within its collection.
    pub record_id: String,
    /// Remaining fields of the record, opaque to the worker.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl RecordRef {
    pub fn new(collection: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            record_id: record_id.into(),
            payload: Map::new(),
        }
    }

    /// Serialize to the JSON wire form used on the queue.
    pub fn to_wire(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("RecordRef is always serializable to JSON")
    }

    /// Parse a queue message back into a record reference.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
