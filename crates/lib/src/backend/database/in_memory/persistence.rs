//! Persistence operations for InMemory backend
//!
//! This module handles serialization and file I/O for saving/loading
//! the in-memory state to/from JSON files.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::{InMemory, Store};
use crate::{
    Error, Result,
    backend::errors::BackendError,
    record::{PositionAccessor, Record},
};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// On-disk layout: collections by name, records ordered by position then id.
#[derive(Serialize, Deserialize)]
struct SerializableStore {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    collections: BTreeMap<String, Vec<Record>>,
}

impl From<&Store> for SerializableStore {
    fn from(store: &Store) -> Self {
        let collections = store
            .collections
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, rows)| {
                let mut records: Vec<Record> = rows.values().cloned().collect();
                records.sort_by(|a, b| {
                    a.position()
                        .cmp(&b.position())
                        .then_with(|| a.id().cmp(b.id()))
                });
                (name.clone(), records)
            })
            .collect();
        Self {
            version: PERSISTENCE_VERSION,
            collections,
        }
    }
}

impl SerializableStore {
    fn into_store(self) -> Store {
        let mut store = Store::default();
        for (name, records) in self.collections {
            let rows = store.collections.entry(name).or_default();
            for mut record in records {
                record.sync_original();
                rows.insert(record.id().clone(), record);
            }
        }
        store
    }
}

/// Saves the entire backend state to a specified file as JSON.
///
/// # Arguments
/// * `backend` - The InMemory backend to save
/// * `path` - The path to the file where the state should be saved.
pub(crate) async fn save_to_file<P: AsRef<Path>>(backend: &InMemory, path: P) -> Result<()> {
    let serializable = {
        let store = backend.store.lock().await;
        SerializableStore::from(&*store)
    };

    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
}

/// Loads the backend state from a specified JSON file.
///
/// If the file does not exist, a new, empty `InMemory` backend is returned.
///
/// # Arguments
/// * `path` - The path to the file from which to load the state.
pub(crate) async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemory> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => {
            let serializable: SerializableStore = serde_json::from_str(&json).map_err(|e| -> Error {
                BackendError::DeserializationFailed { source: e }.into()
            })?;
            Ok(InMemory {
                store: std::sync::Arc::new(tokio::sync::Mutex::new(serializable.into_store())),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::new()),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
