//! Record storage operations for SQL backends.
//!
//! [`SqlxTransaction`] implements `BackendTransaction` on top of one
//! `sqlx::Transaction`. Dropping it without commit rolls back.

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::backend::errors::BackendError;
use crate::constants::POSITION_COLUMN;
use crate::backend::{BackendTransaction, Lock, PositionRange, SortOrder, Visibility};
use crate::record::{PositionAccessor, Record, RecordId};

use super::{DbKind, SqlxResultExt};

/// Columns selected for every record read, in `RecordRow` order.
fn record_columns() -> String {
    format!("id, {POSITION_COLUMN}, payload, deleted_at")
}

/// (id, position, payload, deleted_at)
type RecordRow = (String, i64, String, Option<i64>);

pub(crate) struct SqlxTransaction {
    tx: sqlx::Transaction<'static, sqlx::Any>,
    kind: DbKind,
    /// SQLite only: whether this transaction already holds the database write lock.
    write_locked: bool,
}

fn decode(collection: &str, row: RecordRow) -> Result<Record> {
    let (id, position, payload, deleted_at) = row;
    let payload: Value = serde_json::from_str(&payload)
        .map_err(|e| BackendError::DeserializationFailed { source: e })?;
    Ok(Record::from_storage(
        collection,
        id,
        position,
        payload,
        deleted_at.map(|millis| millis.max(0) as u64),
    ))
}

fn decode_all(collection: &str, rows: Vec<RecordRow>) -> Result<Vec<Record>> {
    rows.into_iter().map(|row| decode(collection, row)).collect()
}

fn encode_payload(record: &Record) -> Result<String> {
    serde_json::to_string(record.payload())
        .map_err(|e| BackendError::SerializationFailed { source: e }.into())
}

fn require_position(record: &Record) -> Result<i64> {
    record.position().ok_or_else(|| {
        BackendError::MissingPosition {
            id: record.id().clone(),
        }
        .into()
    })
}

fn not_found(collection: &str, id: &RecordId) -> crate::Error {
    BackendError::RecordNotFound {
        collection: collection.to_string(),
        id: id.clone(),
    }
    .into()
}

impl SqlxTransaction {
    pub(crate) fn new(tx: sqlx::Transaction<'static, sqlx::Any>, kind: DbKind) -> Self {
        Self {
            tx,
            kind,
            write_locked: false,
        }
    }

    /// Take the SQLite database write lock up front.
    ///
    /// A deferred SQLite transaction that reads first and writes later fails with
    /// `SQLITE_BUSY` instead of waiting when another writer got there first. Any
    /// write statement, even one matching no rows, turns it into a write
    /// transaction that waits on `busy_timeout`.
    async fn acquire_write_lock(&mut self) -> Result<()> {
        if self.kind != DbKind::Sqlite || self.write_locked {
            return Ok(());
        }
        let sql = format!(
            "UPDATE sortable_records SET {POSITION_COLUMN} = {POSITION_COLUMN} WHERE 1 = 0"
        );
        sqlx::query(&sql)
            .execute(&mut *self.tx)
            .await
            .sql_context("Failed to acquire write lock")?;
        self.write_locked = true;
        Ok(())
    }

    /// Prepare a read with the requested lock, returning the SQL suffix to append.
    async fn lock_clause(&mut self, lock: Lock) -> Result<&'static str> {
        match (lock, self.kind) {
            (Lock::Read, _) => Ok(""),
            (Lock::ForUpdate, DbKind::Postgres) => Ok(" FOR UPDATE"),
            (Lock::ForUpdate, DbKind::Sqlite) => {
                self.acquire_write_lock().await?;
                Ok("")
            }
        }
    }
}

#[async_trait]
impl BackendTransaction for SqlxTransaction {
    async fn get(&mut self, collection: &str, id: &RecordId, lock: Lock) -> Result<Option<Record>> {
        let suffix = self.lock_clause(lock).await?;
        let columns = record_columns();
        let sql = format!(
            "SELECT {columns} FROM sortable_records
             WHERE collection = $1 AND id = $2{suffix}"
        );
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(collection)
            .bind(id.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .sql_context("Failed to get record")?;
        row.map(|row| decode(collection, row)).transpose()
    }

    async fn insert(&mut self, record: &Record) -> Result<()> {
        let position = require_position(record)?;
        let payload = encode_payload(record)?;
        let collection = record.collection();

        // Checked up front: a failed INSERT aborts the whole PostgreSQL transaction.
        if self.get(collection, record.id(), Lock::ForUpdate).await?.is_some() {
            return Err(BackendError::RecordAlreadyExists {
                collection: collection.to_string(),
                id: record.id().clone(),
            }
            .into());
        }

        let sql = format!(
            "INSERT INTO sortable_records (collection, id, {POSITION_COLUMN}, payload)
             VALUES ($1, $2, $3, $4)"
        );
        sqlx::query(&sql)
            .bind(collection)
            .bind(record.id().as_str())
            .bind(position)
            .bind(payload)
            .execute(&mut *self.tx)
            .await
            .sql_context("Failed to insert record")?;
        Ok(())
    }

    async fn update(&mut self, record: &Record) -> Result<()> {
        let position = require_position(record)?;
        let payload = encode_payload(record)?;
        self.acquire_write_lock().await?;

        let sql = format!(
            "UPDATE sortable_records SET {POSITION_COLUMN} = $1, payload = $2
             WHERE collection = $3 AND id = $4"
        );
        let result = sqlx::query(&sql)
            .bind(position)
            .bind(payload)
            .bind(record.collection())
            .bind(record.id().as_str())
            .execute(&mut *self.tx)
            .await
            .sql_context("Failed to update record")?;

        if result.rows_affected() == 0 {
            return Err(not_found(record.collection(), record.id()));
        }
        Ok(())
    }

    async fn set_position(&mut self, collection: &str, id: &RecordId, position: i64) -> Result<()> {
        self.acquire_write_lock().await?;
        let sql = format!(
            "UPDATE sortable_records SET {POSITION_COLUMN} = $1
             WHERE collection = $2 AND id = $3"
        );
        let result = sqlx::query(&sql)
            .bind(position)
            .bind(collection)
            .bind(id.as_str())
            .execute(&mut *self.tx)
            .await
            .sql_context("Failed to update position")?;

        if result.rows_affected() == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    async fn set_deleted(
        &mut self,
        collection: &str,
        id: &RecordId,
        deleted_at: Option<u64>,
    ) -> Result<()> {
        self.acquire_write_lock().await?;
        let result = match deleted_at {
            Some(millis) => {
                sqlx::query(
                    "UPDATE sortable_records SET deleted_at = $1
                     WHERE collection = $2 AND id = $3",
                )
                .bind(i64::try_from(millis).unwrap_or(i64::MAX))
                .bind(collection)
                .bind(id.as_str())
                .execute(&mut *self.tx)
                .await
            }
            None => {
                sqlx::query(
                    "UPDATE sortable_records SET deleted_at = NULL
                     WHERE collection = $1 AND id = $2",
                )
                .bind(collection)
                .bind(id.as_str())
                .execute(&mut *self.tx)
                .await
            }
        }
        .sql_context("Failed to update tombstone")?;

        if result.rows_affected() == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    async fn remove(&mut self, collection: &str, id: &RecordId) -> Result<()> {
        self.acquire_write_lock().await?;
        let result = sqlx::query("DELETE FROM sortable_records WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.as_str())
            .execute(&mut *self.tx)
            .await
            .sql_context("Failed to remove record")?;

        if result.rows_affected() == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    async fn count(&mut self, collection: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sortable_records
             WHERE collection = $1 AND deleted_at IS NULL",
        )
        .bind(collection)
        .fetch_one(&mut *self.tx)
        .await
        .sql_context("Failed to count records")?;
        Ok(count)
    }

    async fn max_position(&mut self, collection: &str) -> Result<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX({POSITION_COLUMN}), 0) FROM sortable_records
             WHERE collection = $1 AND deleted_at IS NULL"
        );
        let (max,): (i64,) = sqlx::query_as(&sql)
            .bind(collection)
            .fetch_one(&mut *self.tx)
            .await
            .sql_context("Failed to read max position")?;
        Ok(max)
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
        let suffix = self.lock_clause(Lock::ForUpdate).await?;
        let columns = record_columns();
        let sql = format!(
            "SELECT {columns} FROM sortable_records
             WHERE collection = $1 AND deleted_at IS NULL
               AND {POSITION_COLUMN} BETWEEN $2 AND $3 AND id <> $4
             ORDER BY {POSITION_COLUMN}, id{suffix}"
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql)
            .bind(collection)
            .bind(range.lo)
            .bind(range.hi)
            .bind(exclude.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .sql_context("Failed to lock position range")?;
        decode_all(collection, rows)
    }

    async fn at_position(
        &mut self,
        collection: &str,
        position: i64,
        lock: Lock,
    ) -> Result<Vec<Record>> {
        let suffix = self.lock_clause(lock).await?;
        let columns = record_columns();
        let sql = format!(
            "SELECT {columns} FROM sortable_records
             WHERE collection = $1 AND deleted_at IS NULL AND {POSITION_COLUMN} = $2
             ORDER BY id{suffix}"
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql)
            .bind(collection)
            .bind(position)
            .fetch_all(&mut *self.tx)
            .await
            .sql_context("Failed to find record at position")?;
        decode_all(collection, rows)
    }

    async fn list(
        &mut self,
        collection: &str,
        order: SortOrder,
        visibility: Visibility,
    ) -> Result<Vec<Record>> {
        let filter = match visibility {
            Visibility::Live => " AND deleted_at IS NULL",
            Visibility::Trashed => " AND deleted_at IS NOT NULL",
            Visibility::All => "",
        };
        let direction = match order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let columns = record_columns();
        let sql = format!(
            "SELECT {columns} FROM sortable_records
             WHERE collection = $1{filter}
             ORDER BY {POSITION_COLUMN} {direction}, id"
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql)
            .bind(collection)
            .fetch_all(&mut *self.tx)
            .await
            .sql_context("Failed to list records")?;
        decode_all(collection, rows)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .sql_context("Failed to commit transaction")
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .sql_context("Failed to roll back transaction")
    }
}
