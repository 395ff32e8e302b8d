//! Backend implementations for Sortable storage
//!
//! This module provides the storage traits consumed by the reorder engine and
//! the implementations shipped with the crate (in-memory, SQLite, PostgreSQL).
//!
//! A backend is only ever used through transactions: [`BackendImpl::begin`]
//! returns a [`BackendTransaction`] that sees a consistent view of the store,
//! holds row locks taken with [`Lock::ForUpdate`] until it ends, and applies
//! either all of its writes (`commit`) or none of them (`rollback`, or drop).

use std::any::Any;

use async_trait::async_trait;

use crate::Result;
use crate::record::{Record, RecordId};

pub mod database;
pub mod errors;

pub use errors::BackendError;

/// Row locking requested by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    /// Plain read, no lock beyond what the isolation level gives.
    Read,
    /// Exclusive row lock held until the transaction ends (`SELECT ... FOR UPDATE`).
    ForUpdate,
}

/// Sort direction for listing a collection by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Which records a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Records that are not soft-deleted.
    #[default]
    Live,
    /// Soft-deleted records only.
    Trashed,
    /// Everything.
    All,
}

/// Inclusive range of positions `[lo, hi]`. Empty when `lo > hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRange {
    pub lo: i64,
    pub hi: i64,
}

impl PositionRange {
    pub fn new(lo: i64, hi: i64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, position: i64) -> bool {
        self.lo <= position && position <= self.hi
    }

    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }
}

/// Storage backend for sortable records.
///
/// All backends must be `Send` and `Sync` so an [`Instance`](crate::Instance)
/// can be shared across tasks, and implement `Any` for downcasting (the CLI
/// uses this to persist the in-memory backend on exit).
#[async_trait]
pub trait BackendImpl: Send + Sync + Any {
    /// Opens a new transaction.
    async fn begin(&self) -> Result<Box<dyn BackendTransaction>>;

    /// Names of all collections holding at least one record (live or trashed), sorted.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Returns a reference to the backend as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// One atomic unit of work against a backend.
///
/// Every read that only considers live records (`count`, `max_position`,
/// `lock_range`, `at_position`) ignores soft-deleted rows. Writes are visible to
/// later reads in the same transaction.
#[async_trait]
pub trait BackendTransaction: Send {
    /// Reads one record, live or trashed.
    async fn get(&mut self, collection: &str, id: &RecordId, lock: Lock) -> Result<Option<Record>>;

    /// Inserts a new record. The record must already have a position.
    async fn insert(&mut self, record: &Record) -> Result<()>;

    /// Writes a record's position and payload.
    async fn update(&mut self, record: &Record) -> Result<()>;

    /// Writes only the position of a record.
    async fn set_position(&mut self, collection: &str, id: &RecordId, position: i64) -> Result<()>;

    /// Sets (`Some`) or clears (`None`) the soft-delete tombstone.
    async fn set_deleted(
        &mut self,
        collection: &str,
        id: &RecordId,
        deleted_at: Option<u64>,
    ) -> Result<()>;

    /// Removes a record permanently.
    async fn remove(&mut self, collection: &str, id: &RecordId) -> Result<()>;

    /// Number of live records in the collection.
    async fn count(&mut self, collection: &str) -> Result<i64>;

    /// Highest live position in the collection, 0 when it is empty.
    async fn max_position(&mut self, collection: &str) -> Result<i64>;

    /// Every live record other than `exclude` whose position lies in `range`,
    /// ascending by position (ties by id), locked until the transaction ends.
    async fn lock_range(
        &mut self,
        collection: &str,
        range: PositionRange,
        exclude: &RecordId,
    ) -> Result<Vec<Record>>;

    /// Live records at exactly `position`, ordered by id.
    async fn at_position(&mut self, collection: &str, position: i64, lock: Lock)
    -> Result<Vec<Record>>;

    /// Records of the collection ordered by position (ties by id).
    async fn list(
        &mut self,
        collection: &str,
        order: SortOrder,
        visibility: Visibility,
    ) -> Result<Vec<Record>>;

    /// Makes every write of this transaction durable and releases its locks.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write of this transaction and releases its locks.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
