//! In-memory database backend implementation
//!
//! This module provides an in-memory implementation of [`BackendImpl`],
//! suitable for testing, development, or small deployments that persist the
//! whole state to a JSON file.

mod persistence;
mod storage;

use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::Result;
use crate::backend::{BackendImpl, BackendTransaction};
use crate::record::{Record, RecordId};

use storage::InMemoryTransaction;

/// Rows of one collection keyed by record id.
pub(crate) type CollectionRows = HashMap<RecordId, Record>;

/// Everything the backend stores, guarded by a single mutex.
#[derive(Debug, Default)]
pub(crate) struct Store {
    pub(crate) collections: HashMap<String, CollectionRows>,
    /// Number of writes allowed before the next one fails (test hook).
    #[cfg(test)]
    pub(crate) fail_after_writes: Option<usize>,
}

/// A simple in-memory backend using a `HashMap` per collection.
///
/// Each transaction holds the store's async mutex for its whole lifetime, so
/// writers are serialized and every row read inside a transaction is
/// effectively locked for update. Writes are recorded in an undo log and
/// reverted when the transaction is rolled back or dropped without commit.
///
/// The state can be saved to and loaded from a JSON file with
/// [`save_to_file`](Self::save_to_file) and [`load_from_file`](Self::load_from_file).
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    pub(crate) store: Arc<Mutex<Store>>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves every collection (live and trashed records) to a JSON file.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads the backend state from a JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemory` backend is returned.
    ///
    /// # Arguments
    /// * `path` - The path to the file from which to load the state.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path).await
    }

    /// Make the write after the next `writes` writes fail with a transaction error.
    #[cfg(test)]
    pub(crate) async fn fail_after_writes(&self, writes: usize) {
        self.store.lock().await.fail_after_writes = Some(writes);
    }
}

#[async_trait]
impl BackendImpl for InMemory {
    async fn begin(&self) -> Result<Box<dyn BackendTransaction>> {
        let guard = Arc::clone(&self.store).lock_owned().await;
        tracing::trace!("in-memory transaction started");
        Ok(Box::new(InMemoryTransaction::new(guard)))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let store = self.store.lock().await;
        let mut names: Vec<String> = store
            .collections
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
