//! Sortable records and the position contract the reorder engine relies on.
//!
//! A [`Record`] is one row of a collection: an id, a 1-based `position`, an
//! opaque JSON payload and an optional soft-delete tombstone. Alongside the
//! persisted fields each record remembers the position it was loaded with, so
//! the engine can tell whether (and in which direction) it moved.

mod id;

pub use id::RecordId;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The per-record half of the contract consumed by the
/// [`ReorderEngine`](crate::reorder::ReorderEngine).
///
/// The collection-wide half (`count`, `max_position`, locked range queries)
/// lives on [`BackendTransaction`](crate::backend::BackendTransaction).
pub trait PositionAccessor {
    /// Current (possibly unsaved) position. `None` for a record that was never placed.
    fn position(&self) -> Option<i64>;

    /// Request a new position. Takes effect on the next save.
    fn set_position(&mut self, position: i64);

    /// The position as last read from, or written to, storage.
    fn original_position(&self) -> Option<i64>;

    /// Mark the current position as the persisted one.
    fn sync_original(&mut self);

    /// True when the position differs from the persisted value.
    fn position_changed(&self) -> bool {
        self.position() != self.original_position()
    }
}

/// A single orderable row within a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    collection: String,
    position: Option<i64>,
    #[serde(default)]
    payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleted_at: Option<u64>,
    #[serde(skip)]
    original_position: Option<i64>,
}

impl Record {
    /// Creates a new, unplaced record with a generated id.
    pub fn new(collection: impl Into<String>, payload: Value) -> Self {
        Self::with_id(collection, RecordId::generate(), payload)
    }

    /// Creates a new, unplaced record with a caller-supplied id.
    pub fn with_id(collection: impl Into<String>, id: impl Into<RecordId>, payload: Value) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            position: None,
            payload,
            deleted_at: None,
            original_position: None,
        }
    }

    /// Rebuilds a record read from storage. The loaded position becomes the original.
    pub fn from_storage(
        collection: impl Into<String>,
        id: impl Into<RecordId>,
        position: i64,
        payload: Value,
        deleted_at: Option<u64>,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            position: Some(position),
            payload,
            deleted_at,
            original_position: Some(position),
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Replace the payload. Persisted by the next save.
    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
    }

    /// Soft-delete timestamp in milliseconds since the Unix epoch.
    pub fn deleted_at(&self) -> Option<u64> {
        self.deleted_at
    }

    /// True when the record has been soft-deleted.
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// True when the record has been written to storage at least once.
    pub fn is_persisted(&self) -> bool {
        self.original_position.is_some()
    }

    pub(crate) fn set_deleted_at(&mut self, deleted_at: Option<u64>) {
        self.deleted_at = deleted_at;
    }

    /// Replace the original with the value currently held by storage.
    pub(crate) fn reload_original(&mut self, persisted: Option<i64>) {
        self.original_position = persisted;
    }
}

impl PositionAccessor for Record {
    fn position(&self) -> Option<i64> {
        self.position
    }

    fn set_position(&mut self, position: i64) {
        self.position = Some(position);
    }

    fn original_position(&self) -> Option<i64> {
        self.original_position
    }

    fn sync_original(&mut self) {
        self.original_position = self.position;
    }
}
