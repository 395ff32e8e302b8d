//! Backend creation and utility functions.

use std::path::PathBuf;

use sortable::{
    Instance,
    backend::{
        BackendImpl,
        database::{InMemory, Postgres, Sqlite},
    },
};

use crate::cli::{Backend, BackendConfig};

const SQLITE_FILE: &str = "sortable.db";
const JSON_FILE: &str = "sortable.json";

/// Redact credentials from a PostgreSQL connection URL for safe logging
pub fn redact_postgres_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut redacted = parsed.clone();
        if !parsed.username().is_empty() {
            let _ = redacted.set_username("***");
        }
        if parsed.password().is_some() {
            let _ = redacted.set_password(Some("***"));
        }
        redacted.to_string()
    } else {
        "postgres://***@<unparsable-url>".to_string()
    }
}

fn data_dir(config: &BackendConfig) -> PathBuf {
    config.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Create the appropriate backend based on configuration
pub async fn create_backend(
    config: &BackendConfig,
) -> Result<Box<dyn BackendImpl>, Box<dyn std::error::Error>> {
    let data_dir = data_dir(config);

    match config.backend {
        Backend::Sqlite => {
            tokio::fs::create_dir_all(&data_dir).await?;
            let db_path = data_dir.join(SQLITE_FILE);
            tracing::debug!("Using SQLite backend at {}", db_path.display());
            Ok(Box::new(Sqlite::open(&db_path).await?))
        }
        Backend::Postgres => {
            let url = config
                .postgres_url
                .as_ref()
                .ok_or("PostgreSQL backend requires --postgres-url or SORTABLE_POSTGRES_URL")?;

            let display_url = redact_postgres_url(url);
            tracing::debug!("Connecting to PostgreSQL backend at {}", display_url);

            match Postgres::connect(url).await {
                Ok(backend) => Ok(Box::new(backend)),
                Err(e) => {
                    Err(format!("Failed to connect to PostgreSQL at {display_url}: {e}").into())
                }
            }
        }
        Backend::Inmemory => {
            let json_path = data_dir.join(JSON_FILE);
            tracing::debug!(
                "Using in-memory backend with persistence at {}",
                json_path.display()
            );
            // A missing file loads as an empty backend; a corrupt one is an error
            // so it is never overwritten on save.
            Ok(Box::new(InMemory::load_from_file(&json_path).await?))
        }
    }
}

/// Write the in-memory backend back to its JSON file. Other backends are
/// already durable.
pub async fn persist(
    instance: &Instance,
    config: &BackendConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(in_memory) = instance.backend().as_any().downcast_ref::<InMemory>() else {
        return Ok(());
    };
    let data_dir = data_dir(config);
    tokio::fs::create_dir_all(&data_dir).await?;
    let json_path = data_dir.join(JSON_FILE);
    in_memory.save_to_file(&json_path).await?;
    tracing::debug!("Saved in-memory backend to {}", json_path.display());
    Ok(())
}
