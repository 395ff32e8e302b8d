//! Error types for instance operations.

use thiserror::Error;

/// Errors that can occur while opening collections on an [`Instance`](crate::Instance).
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum InstanceError {
    /// Collection names must be non-empty and at most 255 bytes long.
    #[error("Invalid collection name: {name:?}")]
    InvalidCollectionName {
        /// The rejected name
        name: String,
    },
}

impl InstanceError {
    /// Check if this error is caused by invalid caller input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, InstanceError::InvalidCollectionName { .. })
    }
}

impl From<InstanceError> for crate::Error {
    fn from(err: InstanceError) -> Self {
        crate::Error::Instance(err)
    }
}
