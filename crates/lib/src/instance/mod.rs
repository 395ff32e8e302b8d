//! Instance management.
//!
//! An [`Instance`] owns the storage backend and the clock used for soft-delete
//! timestamps, and hands out [`Collection`] handles by name.

use std::sync::Arc;

use crate::{
    Clock, Result, SystemClock, backend::BackendImpl, collection::Collection,
    constants::MAX_COLLECTION_NAME_LEN,
};

pub mod errors;

pub use errors::InstanceError;

/// Internal state for Instance
///
/// Instance itself is just a cheap-to-clone handle wrapping Arc<InstanceInternal>.
pub(crate) struct InstanceInternal {
    /// The storage backend
    backend: Arc<dyn BackendImpl>,
    /// Time provider for tombstones
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InstanceInternal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceInternal")
            .field("backend", &"<BackendImpl>")
            .field("clock", &self.clock)
            .finish()
    }
}

/// Entry point of the library: a backend plus the collections stored in it.
///
/// Instance is a cheap-to-clone handle around `Arc<InstanceInternal>`.
///
/// ## Example
///
/// ```
/// # use sortable::{backend::database::InMemory, Instance};
/// # use serde_json::json;
/// # #[tokio::main]
/// # async fn main() -> sortable::Result<()> {
/// let instance = Instance::open(Box::new(InMemory::new())).await?;
/// let tasks = instance.collection("tasks")?;
///
/// let first = tasks.create(json!("write docs")).await?;
/// let mut second = tasks.create(json!("ship it")).await?;
/// tasks.move_to_top(&mut second).await?;
///
/// let order: Vec<_> = tasks.sorted(Default::default()).await?;
/// assert_eq!(order[0].id(), second.id());
/// assert_eq!(order[1].id(), first.id());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Instance {
    inner: Arc<InstanceInternal>,
}

impl Instance {
    /// Open an instance on `backend` using the system clock.
    pub async fn open(backend: Box<dyn BackendImpl>) -> Result<Self> {
        Self::open_with_clock(backend, Arc::new(SystemClock)).await
    }

    /// Open an instance with a custom clock.
    ///
    /// The clock stamps soft-deleted records; tests pass a
    /// [`FixedClock`](crate::FixedClock) for deterministic tombstones.
    pub async fn open_with_clock(
        backend: Box<dyn BackendImpl>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let backend: Arc<dyn BackendImpl> = Arc::from(backend);
        tracing::debug!(clock = ?clock, "instance opened");
        Ok(Self {
            inner: Arc::new(InstanceInternal { backend, clock }),
        })
    }

    /// Get a handle on the collection called `name`.
    ///
    /// Collections need no creation step; a collection exists as soon as it
    /// holds a record.
    pub fn collection(&self, name: impl Into<String>) -> Result<Collection> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_COLLECTION_NAME_LEN {
            return Err(InstanceError::InvalidCollectionName { name }.into());
        }
        Ok(Collection::new(
            Arc::clone(&self.inner.backend),
            Arc::clone(&self.inner.clock),
            name,
        ))
    }

    /// Names of every collection holding at least one record, live or trashed.
    pub async fn collections(&self) -> Result<Vec<String>> {
        self.inner.backend.list_collections().await
    }

    /// Get a reference to the backend
    pub fn backend(&self) -> &Arc<dyn BackendImpl> {
        &self.inner.backend
    }

    /// Get the clock used for tombstones
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }
}
