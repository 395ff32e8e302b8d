//! File-backed SQLite: data and schema survive reopening.

use serde_json::json;
use tempfile::TempDir;

use sortable::{Instance, PositionAccessor, backend::database::Sqlite};

use crate::helpers::assert_order;

#[tokio::test]
async fn reopening_a_sqlite_file_keeps_positions() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sortable.db");

    {
        let backend = Sqlite::open(&path).await.unwrap();
        let instance = Instance::open(Box::new(backend)).await.unwrap();
        let tasks = instance.collection("tasks").unwrap();
        for id in ["a", "b", "c"] {
            tasks.create_with_id(id, json!(null)).await.unwrap();
        }
        let mut a = tasks.get("a").await.unwrap().unwrap();
        tasks.move_to_end(&mut a).await.unwrap();
        let mut c = tasks.get("c").await.unwrap().unwrap();
        tasks.delete(&mut c).await.unwrap();
    }

    let backend = Sqlite::open(&path).await.unwrap();
    let instance = Instance::open(Box::new(backend)).await.unwrap();
    let tasks = instance.collection("tasks").unwrap();

    assert_order(&tasks, &["b", "a"]).await;
    let mut c = tasks.get_with_trashed("c").await.unwrap().unwrap();
    assert!(c.is_trashed());
    tasks.restore(&mut c).await.unwrap();
    assert_eq!(c.position(), Some(2));
    assert_order(&tasks, &["b", "c", "a"]).await;
}
