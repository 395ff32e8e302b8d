//! Collection handles: the caller-facing ordering operations.
//!
//! A [`Collection`] is obtained from [`Instance::collection`](crate::Instance::collection).
//! Every mutating operation runs in one backend transaction: it re-reads the
//! record under lock, lets the [`ReorderEngine`] prepare and compensate the
//! write, then commits. The caller's [`Record`] is only updated after the commit
//! succeeded, so a failed operation leaves both the store and the caller's copy
//! unchanged.

use std::sync::Arc;

use serde_json::Value;

use crate::Result;
use crate::backend::{
    BackendError, BackendImpl, BackendTransaction, Lock, SortOrder, Visibility,
};
use crate::clock::Clock;
use crate::record::{PositionAccessor, Record, RecordId};
use crate::reorder::{self, Reorder, ReorderEngine, ReorderError, Target};

/// The other side of a [`Collection::swap_position`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapTarget {
    /// A record identified by id.
    Record(RecordId),
    /// Whichever live record holds this position.
    Position(i64),
}

impl From<&Record> for SwapTarget {
    fn from(record: &Record) -> Self {
        SwapTarget::Record(record.id().clone())
    }
}

impl From<RecordId> for SwapTarget {
    fn from(id: RecordId) -> Self {
        SwapTarget::Record(id)
    }
}

impl From<i64> for SwapTarget {
    fn from(position: i64) -> Self {
        SwapTarget::Position(position)
    }
}

/// A named, densely ordered set of records.
///
/// Handles are cheap to clone and can be shared across tasks.
#[derive(Clone)]
pub struct Collection {
    backend: Arc<dyn BackendImpl>,
    clock: Arc<dyn Clock>,
    name: String,
    engine: ReorderEngine,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Collection {
    pub(crate) fn new(backend: Arc<dyn BackendImpl>, clock: Arc<dyn Clock>, name: String) -> Self {
        Self {
            backend,
            clock,
            name,
            engine: ReorderEngine::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// An unplaced record of this collection with a generated id.
    ///
    /// Nothing is written until the record is passed to [`save`](Self::save).
    pub fn new_record(&self, payload: Value) -> Record {
        Record::new(self.name.clone(), payload)
    }

    // === Creation ===

    /// Append a new record at `max_position() + 1`.
    pub async fn create(&self, payload: Value) -> Result<Record> {
        let mut record = self.new_record(payload);
        self.save(&mut record).await?;
        Ok(record)
    }

    /// Append a new record with a caller-supplied id.
    ///
    /// Fails with [`BackendError::RecordAlreadyExists`] when the id is taken,
    /// including by a trashed record.
    pub async fn create_with_id(&self, id: impl Into<RecordId>, payload: Value) -> Result<Record> {
        let mut record = Record::with_id(self.name.clone(), id, payload);
        self.save(&mut record).await?;
        Ok(record)
    }

    /// Create a record at `position`, shifting the record there and every one
    /// after it down by one.
    ///
    /// The position is clamped into `[1, count() + 1]`.
    pub async fn insert_at(&self, position: i64, payload: Value) -> Result<Record> {
        let mut record = self.new_record(payload);
        record.set_position(position);
        self.save(&mut record).await?;
        Ok(record)
    }

    // === Saving and moving ===

    /// Save a record with [`Reorder::Shift`].
    ///
    /// New records are appended, or inserted at their position when one was set.
    /// Existing records move to their (clamped) position and the siblings in
    /// between shift by one. The payload is written as well. A record whose
    /// position was not changed keeps the position held in storage, even when
    /// the caller's copy is older than a move made since.
    pub async fn save(&self, record: &mut Record) -> Result<()> {
        self.save_with(record, Reorder::Shift).await
    }

    /// Save a record, choosing whether siblings are reordered.
    ///
    /// With [`Reorder::Skip`] the position is written as given and nothing else
    /// changes; the caller is responsible for keeping the collection dense.
    pub async fn save_with(&self, record: &mut Record, reorder: Reorder) -> Result<()> {
        self.check_scope(record)?;
        let mut tx = self.backend.begin().await?;

        let mut working = record.clone();
        if working.is_persisted() {
            let stored = self.lock_live(&mut *tx, working.id()).await?;
            let current = stored_position(&stored)?;
            // An untouched position follows storage; only a requested move shifts.
            if !working.position_changed() {
                working.set_position(current);
            }
            working.reload_original(Some(current));
            working.set_deleted_at(None);
        }
        self.persist(&mut *tx, &mut working, reorder).await?;

        tx.commit().await?;
        *record = working;
        Ok(())
    }

    /// Move a saved record to `target`.
    ///
    /// Relative targets are resolved against the position held in storage.
    pub async fn move_record(&self, record: &mut Record, target: Target) -> Result<()> {
        self.check_scope(record)?;
        self.check_persisted(record)?;
        let mut tx = self.backend.begin().await?;

        let stored = self.lock_live(&mut *tx, record.id()).await?;
        let current = stored_position(&stored)?;
        let mut working = record.clone();
        working.reload_original(Some(current));
        working.set_deleted_at(None);

        let to = target.resolve(&mut *tx, &self.name, current).await?;
        tracing::debug!(collection = %self.name, id = %working.id(), from = current, to, "moving record");
        working.set_position(to);
        self.persist(&mut *tx, &mut working, Reorder::Shift).await?;

        tx.commit().await?;
        *record = working;
        Ok(())
    }

    /// Move a record to `position`, clamped into `[1, count()]`.
    pub async fn move_to(&self, record: &mut Record, position: i64) -> Result<()> {
        self.move_record(record, Target::At(position)).await
    }

    /// Move a record `steps` slots towards position 1.
    pub async fn move_up(&self, record: &mut Record, steps: u64) -> Result<()> {
        self.move_record(record, Target::Up(steps)).await
    }

    /// Move a record `steps` slots towards the end.
    pub async fn move_down(&self, record: &mut Record, steps: u64) -> Result<()> {
        self.move_record(record, Target::Down(steps)).await
    }

    pub async fn move_to_top(&self, record: &mut Record) -> Result<()> {
        self.move_record(record, Target::Top).await
    }

    pub async fn move_to_end(&self, record: &mut Record) -> Result<()> {
        self.move_record(record, Target::End).await
    }

    /// Exchange the positions of two live records. No other record changes.
    ///
    /// Returns the other record as persisted. Swapping a record with itself is a
    /// no-op and returns the record unchanged. A position with no live record
    /// fails with [`ReorderError::NotFoundAtPosition`].
    pub async fn swap_position(
        &self,
        record: &mut Record,
        target: impl Into<SwapTarget>,
    ) -> Result<Record> {
        self.check_scope(record)?;
        self.check_persisted(record)?;
        let target = target.into();
        let mut tx = self.backend.begin().await?;

        let stored = self.lock_live(&mut *tx, record.id()).await?;
        let mine = stored_position(&stored)?;

        let mut other = match &target {
            SwapTarget::Record(id) => self.lock_live(&mut *tx, id).await?,
            SwapTarget::Position(position) => tx
                .at_position(&self.name, *position, Lock::ForUpdate)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| ReorderError::NotFoundAtPosition {
                    collection: self.name.clone(),
                    position: *position,
                })?,
        };

        let mut working = record.clone();
        working.reload_original(Some(mine));
        working.set_deleted_at(None);

        let theirs = stored_position(&other)?;
        if other.id() == working.id() || theirs == mine {
            tx.commit().await?;
            return Ok(other);
        }

        working.set_position(theirs);
        self.persist(&mut *tx, &mut working, Reorder::Skip).await?;
        other.set_position(mine);
        self.persist(&mut *tx, &mut other, Reorder::Skip).await?;
        tracing::debug!(
            collection = %self.name,
            id = %working.id(),
            other = %other.id(),
            from = mine,
            to = theirs,
            "swapped positions"
        );

        tx.commit().await?;
        *record = working;
        Ok(other)
    }

    // === Removal ===

    /// Soft-delete a record and close its slot.
    ///
    /// The record keeps its last position in storage so [`restore`](Self::restore)
    /// can put it back there. On success `record` reflects the persisted state,
    /// including the tombstone.
    pub async fn delete(&self, record: &mut Record) -> Result<()> {
        self.check_scope(record)?;
        self.check_persisted(record)?;
        let mut tx = self.backend.begin().await?;

        let mut stored = self.lock_live(&mut *tx, record.id()).await?;
        let deleted_at = self.clock.now_millis();
        tx.set_deleted(&self.name, stored.id(), Some(deleted_at)).await?;
        stored.set_deleted_at(Some(deleted_at));
        self.engine.after_delete(&mut *tx, &stored).await?;

        tx.commit().await?;
        tracing::debug!(collection = %self.name, id = %stored.id(), "record deleted");
        *record = stored;
        Ok(())
    }

    /// Remove a record permanently.
    ///
    /// A live record's slot is closed. A trashed record is removed without
    /// touching any position.
    pub async fn force_delete(&self, record: Record) -> Result<()> {
        self.check_scope(&record)?;
        self.check_persisted(&record)?;
        let mut tx = self.backend.begin().await?;

        let stored = tx
            .get(&self.name, record.id(), Lock::ForUpdate)
            .await?
            .ok_or_else(|| self.not_found(record.id()))?;
        tx.remove(&self.name, stored.id()).await?;
        if !stored.is_trashed() {
            self.engine.after_delete(&mut *tx, &stored).await?;
        }

        tx.commit().await?;
        tracing::debug!(collection = %self.name, id = %stored.id(), "record removed");
        Ok(())
    }

    /// Bring a soft-deleted record back at its stored position.
    ///
    /// Records from that position on shift down by one. When the stored position
    /// is past the end of the collection the record is placed last.
    pub async fn restore(&self, record: &mut Record) -> Result<()> {
        self.check_scope(record)?;
        self.check_persisted(record)?;
        let mut tx = self.backend.begin().await?;

        let mut stored = tx
            .get(&self.name, record.id(), Lock::ForUpdate)
            .await?
            .ok_or_else(|| self.not_found(record.id()))?;
        if !stored.is_trashed() {
            return Err(ReorderError::NotDeleted {
                id: stored.id().clone(),
            }
            .into());
        }

        tx.set_deleted(&self.name, stored.id(), None).await?;
        stored.set_deleted_at(None);
        self.engine.after_restore(&mut *tx, &mut stored).await?;

        tx.commit().await?;
        tracing::debug!(collection = %self.name, id = %stored.id(), position = ?stored.position(), "record restored");
        *record = stored;
        Ok(())
    }

    // === Queries ===

    /// A live record by id.
    pub async fn get(&self, id: impl Into<RecordId>) -> Result<Option<Record>> {
        Ok(self
            .get_with_trashed(id)
            .await?
            .filter(|record| !record.is_trashed()))
    }

    /// A record by id, live or trashed.
    pub async fn get_with_trashed(&self, id: impl Into<RecordId>) -> Result<Option<Record>> {
        let id = id.into();
        let mut tx = self.backend.begin().await?;
        let record = tx.get(&self.name, &id, Lock::Read).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Live records ordered by position.
    pub async fn sorted(&self, order: SortOrder) -> Result<Vec<Record>> {
        self.list(order, Visibility::Live).await
    }

    /// Live records from the last position to the first.
    pub async fn reversed(&self) -> Result<Vec<Record>> {
        self.sorted(SortOrder::Descending).await
    }

    /// Soft-deleted records ordered by their stored position.
    pub async fn trashed(&self) -> Result<Vec<Record>> {
        self.list(SortOrder::Ascending, Visibility::Trashed).await
    }

    /// Every live record at `position`. Holds exactly one record while the
    /// collection is dense and the position is in range.
    pub async fn at_position(&self, position: i64) -> Result<Vec<Record>> {
        let mut tx = self.backend.begin().await?;
        let records = tx.at_position(&self.name, position, Lock::Read).await?;
        tx.commit().await?;
        Ok(records)
    }

    /// The live record at `position`, if any.
    pub async fn find_at_position(&self, position: i64) -> Result<Option<Record>> {
        Ok(self.at_position(position).await?.into_iter().next())
    }

    /// Number of live records.
    pub async fn count(&self) -> Result<i64> {
        let mut tx = self.backend.begin().await?;
        let count = tx.count(&self.name).await?;
        tx.commit().await?;
        Ok(count)
    }

    /// Highest live position, 0 for an empty collection.
    pub async fn max_position(&self) -> Result<i64> {
        let mut tx = self.backend.begin().await?;
        let max = tx.max_position(&self.name).await?;
        tx.commit().await?;
        Ok(max)
    }

    /// Check that the live positions are exactly `1..=count()`.
    ///
    /// Fails with [`ReorderError::Density`] describing the first gap or duplicate.
    pub async fn verify_density(&self) -> Result<()> {
        let positions: Vec<i64> = self
            .sorted(SortOrder::Ascending)
            .await?
            .iter()
            .filter_map(|record| record.position())
            .collect();
        reorder::check_density(&positions).map_err(|source| {
            ReorderError::Density {
                collection: self.name.clone(),
                source,
            }
            .into()
        })
    }

    // === Internals ===

    async fn list(&self, order: SortOrder, visibility: Visibility) -> Result<Vec<Record>> {
        let mut tx = self.backend.begin().await?;
        let records = tx.list(&self.name, order, visibility).await?;
        tx.commit().await?;
        Ok(records)
    }

    /// Run the save hooks around the write of `working`.
    async fn persist(
        &self,
        tx: &mut dyn BackendTransaction,
        working: &mut Record,
        reorder: Reorder,
    ) -> Result<()> {
        self.engine.before_save(tx, working, reorder).await?;
        if working.is_persisted() {
            tx.update(working).await?;
        } else {
            tx.insert(working).await?;
        }
        self.engine.after_save(tx, working, reorder).await
    }

    /// Lock a record and require it to be live.
    async fn lock_live(&self, tx: &mut dyn BackendTransaction, id: &RecordId) -> Result<Record> {
        let stored = tx
            .get(&self.name, id, Lock::ForUpdate)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        if stored.is_trashed() {
            return Err(ReorderError::AlreadyDeleted { id: id.clone() }.into());
        }
        Ok(stored)
    }

    fn check_scope(&self, record: &Record) -> Result<()> {
        if record.collection() != self.name {
            return Err(ReorderError::WrongCollection {
                id: record.id().clone(),
                expected: self.name.clone(),
                actual: record.collection().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn check_persisted(&self, record: &Record) -> Result<()> {
        if !record.is_persisted() {
            return Err(ReorderError::NotPersisted {
                id: record.id().clone(),
            }
            .into());
        }
        Ok(())
    }

    fn not_found(&self, id: &RecordId) -> crate::Error {
        BackendError::RecordNotFound {
            collection: self.name.clone(),
            id: id.clone(),
        }
        .into()
    }
}

fn stored_position(record: &Record) -> Result<i64> {
    record.position().ok_or_else(|| {
        BackendError::MissingPosition {
            id: record.id().clone(),
        }
        .into()
    })
}
