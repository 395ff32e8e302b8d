//! Storage error types for the Sortable backends.
//!
//! This module defines structured error types for backend operations,
//! providing better error context and type safety compared to string-based errors.

use thiserror::Error;

use crate::record::RecordId;

/// Errors that can occur during backend operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// Record not found by id.
    #[error("Record not found: {collection}/{id}")]
    RecordNotFound {
        /// The collection that was searched
        collection: String,
        /// The id of the record that was not found
        id: RecordId,
    },

    /// A record with the same id already exists in the collection.
    #[error("Record already exists: {collection}/{id}")]
    RecordAlreadyExists {
        /// The collection holding the existing record
        collection: String,
        /// The conflicting id
        id: RecordId,
    },

    /// A record was handed to storage without a position.
    #[error("Record {id} has no position")]
    MissingPosition {
        /// The id of the unplaced record
        id: RecordId,
    },

    /// The transaction could not complete and was rolled back.
    #[error("Transaction failed: {reason}")]
    TransactionFailed {
        /// Description of the failure
        reason: String,
    },

    /// SQL database error from sqlx.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Description of the failed operation
        reason: String,
        /// The underlying sqlx error, if any
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::RecordNotFound { .. })
    }

    /// Check if this error indicates the record already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, BackendError::RecordAlreadyExists { .. })
    }

    /// Check if this error came from the transaction or database layer.
    pub fn is_transaction_failure(&self) -> bool {
        match self {
            BackendError::TransactionFailed { .. } => true,
            #[cfg(any(feature = "sqlite", feature = "postgres"))]
            BackendError::SqlxError { .. } => true,
            _ => false,
        }
    }

    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Get the record id if this error is about a specific record.
    pub fn record_id(&self) -> Option<&RecordId> {
        match self {
            BackendError::RecordNotFound { id, .. }
            | BackendError::RecordAlreadyExists { id, .. }
            | BackendError::MissingPosition { id } => Some(id),
            _ => None,
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
