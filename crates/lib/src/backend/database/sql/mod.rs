//! SQL storage for sortable collections.
//!
//! Every collection shares the `sortable_records` table, keyed by
//! `(collection, id)`. Positions live in [`POSITION_COLUMN`](crate::constants::POSITION_COLUMN)
//! and soft-deleted rows carry a `deleted_at` tombstone.
//!
//! One [`BackendTransaction`] is one `sqlx::Transaction` on an `AnyPool`, so a
//! shift that fails half way is rolled back with the rest of the operation.
//!
//! Locking differs per database:
//!
//! - **PostgreSQL** (feature `postgres`): the moved row and every sibling in the
//!   shifted window are read with `FOR UPDATE`.
//! - **SQLite** (feature `sqlite`): there are no row locks. Before its first
//!   locking read a transaction issues an UPDATE that matches nothing, which
//!   takes the database write lock and makes other writers wait on
//!   `busy_timeout`.

mod storage;

/// Table layout and schema versioning.
pub mod schema;

use std::any::Any;
#[cfg(feature = "postgres")]
use std::time::Duration;

use async_trait::async_trait;
use sqlx::AnyPool;
#[cfg(feature = "postgres")]
use sqlx::Executor;
use sqlx::any::AnyPoolOptions;

use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{BackendImpl, BackendTransaction};

use storage::SqlxTransaction;

/// Attach a context message to sqlx failures.
pub(crate) trait SqlxResultExt<T> {
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            BackendError::SqlxError {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }
}

/// Which SQL dialect a pool speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Sqlite,
    Postgres,
}

/// Pragmas applied to every SQLite database; file databases also get WAL.
#[cfg(feature = "sqlite")]
const SQLITE_PRAGMAS: &str = "PRAGMA busy_timeout = 5000;";
#[cfg(feature = "sqlite")]
const SQLITE_FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;";

/// Sortable storage on SQLite or PostgreSQL.
///
/// Use the [`Sqlite`] or [`Postgres`] alias for the constructors of the
/// database at hand.
pub struct SqlxBackend {
    pool: AnyPool,
    kind: DbKind,
}

impl SqlxBackend {
    pub(crate) fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Wrap a configured pool and bring its schema up to date.
    async fn with_schema(pool: AnyPool, kind: DbKind) -> Result<Self> {
        let backend = Self { pool, kind };
        schema::initialize(&backend).await?;
        tracing::debug!(?kind, "sql backend ready");
        Ok(backend)
    }
}

#[cfg(feature = "sqlite")]
impl SqlxBackend {
    /// Open (or create) the SQLite database file at `path`.
    ///
    /// ```ignore
    /// use sortable::backend::database::Sqlite;
    ///
    /// let backend = Sqlite::open("positions.db").await?;
    /// ```
    pub async fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path.as_ref().display());
        Self::connect_sqlite(&url, false).await
    }

    /// A private SQLite database in memory, dropped with the backend.
    pub async fn in_memory() -> Result<Self> {
        // Pooled connections must share one database, so it needs a unique name.
        let url = format!(
            "sqlite:file:sortable_{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4().simple()
        );
        Self::connect_sqlite(&url, true).await
    }

    async fn connect_sqlite(url: &str, in_memory: bool) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new().max_connections(5);
        if in_memory {
            // The shared in-memory database disappears with its last connection.
            options = options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = options
            .connect(url)
            .await
            .sql_context("Failed to open SQLite database")?;

        let pragmas = if in_memory {
            SQLITE_PRAGMAS.to_string()
        } else {
            format!("{SQLITE_FILE_PRAGMAS} {SQLITE_PRAGMAS}")
        };
        sqlx::query(&pragmas)
            .execute(&pool)
            .await
            .sql_context("Failed to configure SQLite")?;

        Self::with_schema(pool, DbKind::Sqlite).await
    }
}

#[cfg(feature = "postgres")]
impl SqlxBackend {
    /// Connect to PostgreSQL and use the tables of the default schema.
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .sql_context("Failed to connect to PostgreSQL")?;
        Self::with_schema(pool, DbKind::Postgres).await
    }

    /// Connect to PostgreSQL inside a freshly created schema.
    ///
    /// Every call gets its own tables, so tests can share one database.
    pub async fn connect_isolated(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let schema = format!("sortable_{}", uuid::Uuid::new_v4().simple());

        let setup = AnyPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .sql_context("Failed to connect to PostgreSQL")?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
            .execute(&setup)
            .await
            .sql_context(&format!("Failed to create schema {schema}"))?;
        setup.close().await;

        let search_path = format!("SET search_path TO {schema}");
        let pool = AnyPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(url)
            .await
            .sql_context("Failed to connect to PostgreSQL")?;
        Self::with_schema(pool, DbKind::Postgres).await
    }
}

#[async_trait]
impl BackendImpl for SqlxBackend {
    async fn begin(&self) -> Result<Box<dyn BackendTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .sql_context("Failed to begin transaction")?;
        Ok(Box::new(SqlxTransaction::new(tx, self.kind)))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT collection FROM sortable_records ORDER BY collection",
        )
        .fetch_all(&self.pool)
        .await
        .sql_context("Failed to list collections")?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(feature = "sqlite")]
pub type Sqlite = SqlxBackend;

#[cfg(feature = "postgres")]
pub type Postgres = SqlxBackend;
