//! Transactions for the InMemory backend.
//!
//! A transaction owns the store's mutex guard. Every write first saves the
//! previous version of the row in an undo log; rollback (explicit or on drop)
//! replays the log in reverse.

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use super::Store;
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{BackendTransaction, Lock, PositionRange, SortOrder, Visibility};
use crate::record::{PositionAccessor, Record, RecordId};

/// Previous state of one row, `None` when the row did not exist.
struct UndoEntry {
    collection: String,
    id: RecordId,
    previous: Option<Record>,
}

pub(crate) struct InMemoryTransaction {
    store: OwnedMutexGuard<Store>,
    undo: Vec<UndoEntry>,
    finished: bool,
}

impl InMemoryTransaction {
    pub(crate) fn new(store: OwnedMutexGuard<Store>) -> Self {
        Self {
            store,
            undo: Vec::new(),
            finished: false,
        }
    }

    /// Save the current version of a row before it is modified.
    fn record_undo(&mut self, collection: &str, id: &RecordId) -> Result<()> {
        #[cfg(test)]
        match self.store.fail_after_writes {
            Some(0) => {
                self.store.fail_after_writes = None;
                return Err(BackendError::TransactionFailed {
                    reason: "injected write failure".to_string(),
                }
                .into());
            }
            Some(n) => self.store.fail_after_writes = Some(n - 1),
            None => {}
        }

        let previous = self
            .store
            .collections
            .get(collection)
            .and_then(|rows| rows.get(id))
            .cloned();
        self.undo.push(UndoEntry {
            collection: collection.to_string(),
            id: id.clone(),
            previous,
        });
        Ok(())
    }

    fn revert(&mut self) {
        let reverted = self.undo.len();
        while let Some(entry) = self.undo.pop() {
            let rows = self.store.collections.entry(entry.collection).or_default();
            match entry.previous {
                Some(record) => {
                    rows.insert(entry.id, record);
                }
                None => {
                    rows.remove(&entry.id);
                }
            }
        }
        self.store.collections.retain(|_, rows| !rows.is_empty());
        if reverted > 0 {
            tracing::debug!(writes = reverted, "in-memory transaction rolled back");
        }
    }

    fn stored_mut(&mut self, collection: &str, id: &RecordId) -> Result<&mut Record> {
        self.store
            .collections
            .get_mut(collection)
            .and_then(|rows| rows.get_mut(id))
            .ok_or_else(|| {
                BackendError::RecordNotFound {
                    collection: collection.to_string(),
                    id: id.clone(),
                }
                .into()
            })
    }

    fn live(&self, collection: &str) -> impl Iterator<Item = &Record> {
        self.store
            .collections
            .get(collection)
            .into_iter()
            .flat_map(|rows| rows.values())
            .filter(|record| !record.is_trashed())
    }
}

fn by_position(a: &Record, b: &Record) -> std::cmp::Ordering {
    a.position()
        .cmp(&b.position())
        .then_with(|| a.id().cmp(b.id()))
}

fn persisted_copy(record: &Record) -> Result<Record> {
    if record.position().is_none() {
        return Err(BackendError::MissingPosition {
            id: record.id().clone(),
        }
        .into());
    }
    let mut stored = record.clone();
    stored.sync_original();
    Ok(stored)
}

#[async_trait]
impl BackendTransaction for InMemoryTransaction {
    async fn get(&mut self, collection: &str, id: &RecordId, _lock: Lock) -> Result<Option<Record>> {
        Ok(self
            .store
            .collections
            .get(collection)
            .and_then(|rows| rows.get(id))
            .cloned())
    }

    async fn insert(&mut self, record: &Record) -> Result<()> {
        let stored = persisted_copy(record)?;
        let collection = record.collection();
        let exists = self
            .store
            .collections
            .get(collection)
            .is_some_and(|rows| rows.contains_key(record.id()));
        if exists {
            return Err(BackendError::RecordAlreadyExists {
                collection: collection.to_string(),
                id: record.id().clone(),
            }
            .into());
        }

        self.record_undo(collection, record.id())?;
        self.store
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(record.id().clone(), stored);
        Ok(())
    }

    async fn update(&mut self, record: &Record) -> Result<()> {
        let updated = persisted_copy(record)?;
        // Fail before touching the undo log when the row is missing.
        self.stored_mut(record.collection(), record.id())?;
        self.record_undo(record.collection(), record.id())?;

        let stored = self.stored_mut(record.collection(), record.id())?;
        let deleted_at = stored.deleted_at();
        *stored = updated;
        stored.set_deleted_at(deleted_at);
        Ok(())
    }

    async fn set_position(&mut self, collection: &str, id: &RecordId, position: i64) -> Result<()> {
        self.stored_mut(collection, id)?;
        self.record_undo(collection, id)?;

        let stored = self.stored_mut(collection, id)?;
        stored.set_position(position);
        stored.sync_original();
        Ok(())
    }

    async fn set_deleted(
        &mut self,
        collection: &str,
        id: &RecordId,
        deleted_at: Option<u64>,
    ) -> Result<()> {
        self.stored_mut(collection, id)?;
        self.record_undo(collection, id)?;

        self.stored_mut(collection, id)?.set_deleted_at(deleted_at);
        Ok(())
    }

    async fn remove(&mut self, collection: &str, id: &RecordId) -> Result<()> {
        self.stored_mut(collection, id)?;
        self.record_undo(collection, id)?;

        if let Some(rows) = self.store.collections.get_mut(collection) {
            rows.remove(id);
        }
        Ok(())
    }

    async fn count(&mut self, collection: &str) -> Result<i64> {
        Ok(self.live(collection).count() as i64)
    }

    async fn max_position(&mut self, collection: &str) -> Result<i64> {
        Ok(self
            .live(collection)
            .filter_map(|record| record.position())
            .max()
            .unwrap_or(0))
    }

    async fn lock_range(
        &mut self,
        collection: &str,
        range: PositionRange,
        exclude: &RecordId,
    ) -> Result<Vec<Record>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let mut records: Vec<Record> = self
            .live(collection)
            .filter(|record| record.id() != exclude)
            .filter(|record| record.position().is_some_and(|p| range.contains(p)))
            .cloned()
            .collect();
        records.sort_by(by_position);
        Ok(records)
    }

    async fn at_position(
        &mut self,
        collection: &str,
        position: i64,
        _lock: Lock,
    ) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = self
            .live(collection)
            .filter(|record| record.position() == Some(position))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(records)
    }

    async fn list(
        &mut self,
        collection: &str,
        order: SortOrder,
        visibility: Visibility,
    ) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = self
            .store
            .collections
            .get(collection)
            .into_iter()
            .flat_map(|rows| rows.values())
            .filter(|record| match visibility {
                Visibility::Live => !record.is_trashed(),
                Visibility::Trashed => record.is_trashed(),
                Visibility::All => true,
            })
            .cloned()
            .collect();
        match order {
            SortOrder::Ascending => records.sort_by(by_position),
            SortOrder::Descending => records.sort_by(|a, b| {
                b.position()
                    .cmp(&a.position())
                    .then_with(|| a.id().cmp(b.id()))
            }),
        }
        Ok(records)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        tracing::trace!(writes = this.undo.len(), "in-memory transaction committed");
        this.undo.clear();
        this.finished = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.revert();
        this.finished = true;
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.revert();
        }
    }
}
