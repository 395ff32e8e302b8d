//!
//! Sortable: dense, gap-free position ordering for records in relational collections.
//! This library keeps the integer `position` of every live record in a collection equal to
//! exactly `1..N` while records are created, moved, swapped, deleted and restored.
//!
//! ## Core Concepts
//!
//! * **Records (`record::Record`)**: A row in a collection carrying an id, a position, an opaque JSON payload
//!   and an optional soft-delete tombstone.
//! * **PositionAccessor (`record::PositionAccessor`)**: The per-record contract the reorder engine relies on.
//! * **Collections (`collection::Collection`)**: The scope over which positions are dense. All caller-facing
//!   operations (`move_to`, `move_up`, `swap_position`, `delete`, `restore`, ...) live here.
//! * **ReorderEngine (`reorder::ReorderEngine`)**: The hooks that run around every save, delete and restore and
//!   shift the minimal range of sibling records inside one locked transaction.
//! * **Backends (`backend::BackendImpl`)**: A pluggable transactional storage layer. `InMemory`, SQLite and
//!   PostgreSQL implementations are provided.
//! * **Instance (`instance::Instance`)**: Owns the backend and hands out `Collection` handles.

pub mod backend;
pub mod clock;
pub mod collection;
pub mod constants;
pub mod instance;
pub mod record;
pub mod reorder;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use collection::{Collection, SwapTarget};
pub use instance::Instance;
pub use record::{PositionAccessor, Record, RecordId};
pub use reorder::{Reorder, ReorderEngine, Target};

/// Result type used throughout the Sortable library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Sortable library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured storage errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured ordering errors from the reorder module
    #[error(transparent)]
    Reorder(reorder::ReorderError),

    /// Structured instance errors from the instance module
    #[error(transparent)]
    Instance(instance::InstanceError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Backend(_) => "backend",
            Error::Reorder(_) => "reorder",
            Error::Instance(_) => "instance",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_not_found(),
            Error::Reorder(reorder_err) => reorder_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (already exists, wrong lifecycle state).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_already_exists(),
            Error::Reorder(reorder_err) => reorder_err.is_state_conflict(),
            _ => false,
        }
    }

    /// Check if this error came from a failed or aborted storage transaction.
    ///
    /// When this is true the transaction was rolled back and no positions changed.
    pub fn is_transaction_failure(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_transaction_failure(),
            _ => false,
        }
    }
}
