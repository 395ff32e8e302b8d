//! SQL schema definitions and migrations.
//!
//! This module contains the database schema used by the SQL backends.
//! The schema is designed to be portable between SQLite and Postgres.
//!
//! # Migration System
//!
//! The migration system uses code-based migrations rather than SQL files to handle
//! dialect differences between SQLite and PostgreSQL. Each migration is a function
//! that receives the backend and can execute database-specific SQL as needed.
//!
//! ## Adding a New Migration
//!
//! 1. Increment `SCHEMA_VERSION`
//! 2. Add a new `migrate_vN_to_vM` async function
//! 3. Add the migration to the match statement in `run_migration`
//! 4. Document what the migration does

use crate::Result;
use crate::backend::errors::BackendError;
use crate::constants::POSITION_COLUMN;

use super::{SqlxBackend, SqlxResultExt};

/// Current schema version.
///
/// Increment this when making schema changes that require migration.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL statements to create the schema tables.
///
/// Each statement uses portable SQL that works on both SQLite and PostgreSQL.
pub fn create_tables() -> Vec<String> {
    vec![
        // Schema version tracking
        // BIGINT (64-bit) used for portability between SQLite and PostgreSQL
        "CREATE TABLE IF NOT EXISTS schema_version (
            version BIGINT PRIMARY KEY
        )"
        .to_string(),
        // Sortable records, scoped by collection
        // No unique constraint on the position: a shift briefly holds two rows on
        // the same slot inside its transaction.
        // deleted_at is the soft-delete tombstone (milliseconds), NULL while live
        format!(
            "CREATE TABLE IF NOT EXISTS sortable_records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                {POSITION_COLUMN} BIGINT NOT NULL,
                payload TEXT NOT NULL,
                deleted_at BIGINT,
                PRIMARY KEY (collection, id)
            )"
        ),
    ]
}

/// SQL statements to create indexes.
pub fn create_indexes() -> Vec<String> {
    // Range scans and max/count over a collection's positions
    vec![format!(
        "CREATE INDEX IF NOT EXISTS idx_sortable_records_position \
         ON sortable_records(collection, {POSITION_COLUMN})"
    )]
}

/// Initialize the database schema.
///
/// Creates tables and indexes if they don't exist, records the schema version
/// on first use and runs migrations when an older version is found.
pub async fn initialize(backend: &SqlxBackend) -> Result<()> {
    let pool = backend.pool();

    for statement in create_tables() {
        sqlx::query(&statement)
            .execute(pool)
            .await
            .sql_context(&format!("Schema creation failed - SQL: {statement}"))?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .sql_context("Failed to check schema version")?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .sql_context("Failed to initialize schema version")?;
            tracing::info!(version = SCHEMA_VERSION, "Initialized sortable schema");
        }
        Some((current,)) if current < SCHEMA_VERSION => {
            migrate(backend, current, SCHEMA_VERSION).await?;
        }
        Some((current,)) if current > SCHEMA_VERSION => {
            return Err(BackendError::SqlxError {
                reason: format!(
                    "Database schema v{current} is newer than supported v{SCHEMA_VERSION}"
                ),
                source: None,
            }
            .into());
        }
        Some(_) => {}
    }

    for statement in create_indexes() {
        sqlx::query(&statement)
            .execute(pool)
            .await
            .sql_context(&format!("Index creation failed - SQL: {statement}"))?;
    }

    Ok(())
}

/// Run migrations sequentially from one schema version to another,
/// bumping the stored version after each step.
async fn migrate(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    tracing::info!(from, to, "Starting SQL schema migration");

    for current in from..to {
        let next = current + 1;
        run_migration(backend, current, next).await?;

        sqlx::query("UPDATE schema_version SET version = $1")
            .bind(next)
            .execute(backend.pool())
            .await
            .sql_context(&format!("Failed to update schema version to {next}"))?;

        tracing::info!(version = next, "Migration completed");
    }

    Ok(())
}

/// Execute a single migration step. New migrations are added as match arms on `from`.
async fn run_migration(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    // No migrations exist yet; v1 is the first schema.
    let _ = backend;

    Err(BackendError::SqlxError {
        reason: format!(
            "Unknown migration path: v{from} to v{to}. \
             SCHEMA_VERSION was incremented without adding a migration."
        ),
        source: None,
    }
    .into())
}
