//! Error types for ordering operations.

use thiserror::Error;

use crate::record::RecordId;

/// A violation of the dense `1..N` ordering found by
/// [`Collection::verify_density`](crate::Collection::verify_density).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DensityError {
    /// The slot `expected` is empty; the next live record sits at `found`.
    #[error("position {expected} is missing, next record is at {found}")]
    Gap { expected: i64, found: i64 },

    /// More than one live record holds `position`.
    #[error("position {position} is held by more than one record")]
    Duplicate { position: i64 },
}

/// Errors raised by the reorder engine and the collection operations built on it.
///
/// Out-of-range positions are never errors: they are clamped into `[1, count]`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ReorderError {
    /// No live record holds the requested position (swap target lookup).
    #[error("No record at position {position} in collection {collection}")]
    NotFoundAtPosition {
        /// The collection that was searched
        collection: String,
        /// The requested position
        position: i64,
    },

    /// The operation needs a record that was saved before.
    #[error("Record {id} has not been saved yet")]
    NotPersisted {
        /// The id of the unsaved record
        id: RecordId,
    },

    /// The record is soft-deleted and must be restored first.
    #[error("Record {id} is deleted")]
    AlreadyDeleted {
        /// The id of the trashed record
        id: RecordId,
    },

    /// Restore was requested for a record that is not soft-deleted.
    #[error("Record {id} is not deleted")]
    NotDeleted {
        /// The id of the live record
        id: RecordId,
    },

    /// The record belongs to another collection than the handle it was passed to.
    #[error("Record {id} belongs to collection {actual}, not {expected}")]
    WrongCollection {
        /// The id of the record
        id: RecordId,
        /// The collection of the handle
        expected: String,
        /// The collection stored on the record
        actual: String,
    },

    /// The live collection is not densely ordered.
    #[error("Collection {collection} is not dense: {source}")]
    Density {
        /// The collection that was checked
        collection: String,
        /// The first violation found
        #[source]
        source: DensityError,
    },
}

impl ReorderError {
    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReorderError::NotFoundAtPosition { .. })
    }

    /// Check if this error indicates the record is in the wrong lifecycle state or scope.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            ReorderError::NotPersisted { .. }
                | ReorderError::AlreadyDeleted { .. }
                | ReorderError::NotDeleted { .. }
                | ReorderError::WrongCollection { .. }
        )
    }

    /// Check if this error reports a broken ordering.
    pub fn is_density_violation(&self) -> bool {
        matches!(self, ReorderError::Density { .. })
    }
}

impl From<ReorderError> for crate::Error {
    fn from(err: ReorderError) -> Self {
        crate::Error::Reorder(err)
    }
}
