use std::io::Write;

use serde_json::json;
use tempfile::TempDir;

use sortable::{Instance, PositionAccessor, backend::database::InMemory};

use crate::helpers::assert_order;

#[tokio::test]
async fn test_in_memory_backend_save_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("sortable.json");

    // Setup: a collection with a moved and a trashed record
    {
        let backend = InMemory::new();
        let instance = Instance::open(Box::new(backend.clone())).await.unwrap();
        let tasks = instance.collection("tasks").unwrap();
        for id in ["a", "b", "c"] {
            tasks.create_with_id(id, json!({ "name": id })).await.unwrap();
        }
        let mut c = tasks.get("c").await.unwrap().unwrap();
        tasks.move_to_top(&mut c).await.unwrap();
        let mut b = tasks.get("b").await.unwrap().unwrap();
        tasks.delete(&mut b).await.unwrap();

        backend.save_to_file(&file_path).await.unwrap();
    }

    assert!(file_path.exists());

    let loaded = InMemory::load_from_file(&file_path).await.unwrap();
    let instance = Instance::open(Box::new(loaded)).await.unwrap();
    let tasks = instance.collection("tasks").unwrap();

    assert_order(&tasks, &["c", "a"]).await;
    let trashed = tasks.trashed().await.unwrap();
    assert_eq!(trashed.len(), 1);
    assert_eq!(trashed[0].id().as_str(), "b");
    assert!(trashed[0].deleted_at().is_some());
    assert_eq!(
        tasks.get("a").await.unwrap().unwrap().payload(),
        &json!({ "name": "a" })
    );

    // Loaded records behave like any other: b comes back at its stored slot.
    let mut b = trashed[0].clone();
    tasks.restore(&mut b).await.unwrap();
    assert_eq!(b.position(), Some(3));
    assert_order(&tasks, &["c", "a", "b"]).await;
}

#[tokio::test]
async fn test_load_non_existent_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.json");

    let backend = InMemory::load_from_file(&path).await.unwrap();
    let instance = Instance::open(Box::new(backend)).await.unwrap();
    assert!(instance.collections().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_load_invalid_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("invalid.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"{ not json").unwrap();

    let err = InMemory::load_from_file(&path).await.unwrap_err();
    assert_eq!(err.module(), "backend");
}
