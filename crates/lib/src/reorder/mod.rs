//! The position-reindexing engine.
//!
//! [`ReorderEngine`] holds the hooks a [`Collection`](crate::Collection) runs
//! around every write of a record:
//!
//! * [`before_save`](ReorderEngine::before_save) gives a new record its slot and
//!   clamps requested positions into the live range.
//! * [`after_save`](ReorderEngine::after_save) shifts the siblings between the
//!   record's old and new slot.
//! * [`after_delete`](ReorderEngine::after_delete) closes the slot a record left.
//! * [`after_restore`](ReorderEngine::after_restore) reopens a slot for a record
//!   coming back from the trash.
//!
//! Every hook works on the caller's open [`BackendTransaction`]; the engine
//! never commits, caches records or retries.

mod errors;

pub use errors::{DensityError, ReorderError};

use crate::Result;
use crate::backend::{BackendTransaction, PositionRange};
use crate::constants::FIRST_POSITION;
use crate::record::{PositionAccessor, Record};

/// Whether a save takes part in reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reorder {
    /// Clamp the position and shift siblings to keep the collection dense.
    #[default]
    Shift,
    /// Write the position as given. The caller keeps the collection dense.
    Skip,
}

impl Reorder {
    pub fn is_shift(self) -> bool {
        self == Reorder::Shift
    }
}

/// Where a record should move to.
///
/// Relative targets are resolved against the position currently held in
/// storage, not against the caller's copy of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// An absolute position. Out-of-range values are clamped on save.
    At(i64),
    /// Position 1.
    Top,
    /// The last live position.
    End,
    /// `n` slots towards the top.
    Up(u64),
    /// `n` slots towards the end.
    Down(u64),
}

impl Target {
    /// Turn the target into an absolute (not yet clamped) position.
    pub async fn resolve(
        self,
        tx: &mut dyn BackendTransaction,
        collection: &str,
        current: i64,
    ) -> Result<i64> {
        Ok(match self {
            Target::At(position) => position,
            Target::Top => FIRST_POSITION,
            Target::End => tx.count(collection).await?,
            Target::Up(steps) => current.saturating_sub(steps_as_i64(steps)),
            Target::Down(steps) => current.saturating_add(steps_as_i64(steps)),
        })
    }
}

fn steps_as_i64(steps: u64) -> i64 {
    i64::try_from(steps).unwrap_or(i64::MAX)
}

/// The reorder hooks.
///
/// Stateless; every piece of state lives in the record and the transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReorderEngine;

impl ReorderEngine {
    pub fn new() -> Self {
        Self
    }

    /// Prepare a record's position before it is written.
    ///
    /// A record that was never placed is appended after the current maximum.
    /// With [`Reorder::Shift`] a requested position is clamped into
    /// `[1, count]` for an existing record and `[1, count + 1]` for a new one.
    pub async fn before_save(
        &self,
        tx: &mut dyn BackendTransaction,
        record: &mut Record,
        reorder: Reorder,
    ) -> Result<()> {
        let collection = record.collection().to_string();

        let Some(requested) = record.position() else {
            let position = tx.max_position(&collection).await? + 1;
            tracing::debug!(collection = %collection, id = %record.id(), position, "appending new record");
            record.set_position(position);
            return Ok(());
        };

        if !reorder.is_shift() {
            return Ok(());
        }

        let count = tx.count(&collection).await?;
        let upper = if record.is_persisted() {
            // A persisted record that is live already counts itself.
            count
        } else {
            count + 1
        };
        let position = clamp(requested, upper);
        if position != requested {
            tracing::debug!(collection = %collection, id = %record.id(), requested, position, "position clamped");
            record.set_position(position);
        }
        Ok(())
    }

    /// Shift the siblings of a record that was just written.
    ///
    /// `record` must still carry the original position it was loaded with.
    /// For a new record the original is taken to be the post-insert count, so
    /// inserting at any live slot, the last one included, pushes the tail down
    /// by one.
    /// On success the record's original is synced to its new position.
    pub async fn after_save(
        &self,
        tx: &mut dyn BackendTransaction,
        record: &mut Record,
        reorder: Reorder,
    ) -> Result<()> {
        let Some(to) = record.position() else {
            return Ok(());
        };
        if !reorder.is_shift() || !record.position_changed() {
            record.sync_original();
            return Ok(());
        }

        // A new record already counts itself, so its notional origin is the
        // slot one past the old tail.
        let from = match record.original_position() {
            Some(from) => from,
            None => tx.count(record.collection()).await?,
        };

        if to < from {
            self.shift_up(tx, record, to, from).await?;
        } else if to > from {
            self.shift_down(tx, record, from, to).await?;
        }
        record.sync_original();
        Ok(())
    }

    /// Close the slot of a record that just left the live set.
    ///
    /// Must run after the tombstone was set or the row was removed, inside the
    /// same transaction.
    pub async fn after_delete(&self, tx: &mut dyn BackendTransaction, record: &Record) -> Result<()> {
        let Some(from) = record.original_position() else {
            return Ok(());
        };
        let to = tx.max_position(record.collection()).await?;
        self.shift_down(tx, record, from, to).await
    }

    /// Reopen a slot for a record whose tombstone was just cleared.
    ///
    /// The stored position is clamped into `[1, count]`, so a record whose old
    /// slot no longer exists lands at the end. The clamped position is written
    /// and synced into `record`.
    pub async fn after_restore(
        &self,
        tx: &mut dyn BackendTransaction,
        record: &mut Record,
    ) -> Result<()> {
        let collection = record.collection().to_string();
        let stored = record.original_position().or(record.position()).unwrap_or(FIRST_POSITION);
        let count = tx.count(&collection).await?;
        let to = clamp(stored, count);
        if to != stored {
            tracing::debug!(collection = %collection, id = %record.id(), stored, position = to, "restored position clamped");
            tx.set_position(&collection, record.id(), to).await?;
        }
        record.set_position(to);
        record.sync_original();

        let from = tx.max_position(&collection).await?;
        self.shift_up(tx, record, to, from).await
    }

    /// Move every other live record in `[to, from]` one slot towards the end.
    ///
    /// The locked siblings are renumbered `to + 1, to + 2, ...` in ascending order.
    pub async fn shift_up(
        &self,
        tx: &mut dyn BackendTransaction,
        record: &Record,
        to: i64,
        from: i64,
    ) -> Result<()> {
        let collection = record.collection();
        let siblings = tx
            .lock_range(collection, PositionRange::new(to, from), record.id())
            .await?;
        tracing::debug!(collection, from, to, shifted = siblings.len(), "shift up");
        renumber(tx, collection, &siblings, to + 1).await
    }

    /// Move every other live record in `[from, to]` one slot towards the top.
    ///
    /// The locked siblings are renumbered `from, from + 1, ...` in ascending order.
    pub async fn shift_down(
        &self,
        tx: &mut dyn BackendTransaction,
        record: &Record,
        from: i64,
        to: i64,
    ) -> Result<()> {
        let collection = record.collection();
        let siblings = tx
            .lock_range(collection, PositionRange::new(from, to), record.id())
            .await?;
        tracing::debug!(collection, from, to, shifted = siblings.len(), "shift down");
        renumber(tx, collection, &siblings, from).await
    }
}

/// Clamp into `[1, upper]`. An empty range (`upper < 1`) yields 1.
fn clamp(position: i64, upper: i64) -> i64 {
    position.min(upper).max(FIRST_POSITION)
}

async fn renumber(
    tx: &mut dyn BackendTransaction,
    collection: &str,
    siblings: &[Record],
    first: i64,
) -> Result<()> {
    let mut next = first;
    for sibling in siblings {
        if sibling.position() != Some(next) {
            tx.set_position(collection, sibling.id(), next).await?;
        }
        next += 1;
    }
    Ok(())
}

/// Check that `positions` (sorted ascending) are exactly `1..=len`.
pub(crate) fn check_density(positions: &[i64]) -> std::result::Result<(), DensityError> {
    let mut expected = FIRST_POSITION;
    let mut previous = None;
    for &position in positions {
        if previous == Some(position) {
            return Err(DensityError::Duplicate { position });
        }
        if position != expected {
            return Err(DensityError::Gap {
                expected,
                found: position,
            });
        }
        previous = Some(position);
        expected += 1;
    }
    Ok(())
}
