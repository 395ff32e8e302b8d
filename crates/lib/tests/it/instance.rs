//! Instance: collection handles and listing.

use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn collection_names_are_validated() {
    let instance = test_instance().await;

    let err = instance.collection("").unwrap_err();
    assert_eq!(err.module(), "instance");
    assert!(instance.collection("n".repeat(300)).is_err());
}

#[tokio::test]
async fn collections_lists_names_with_records() {
    let instance = test_instance().await;
    let tasks = instance.collection("tasks").unwrap();
    let notes = instance.collection("notes").unwrap();
    let _unused = instance.collection("unused").unwrap();

    assert!(instance.collections().await.unwrap().is_empty());

    tasks.create(json!(1)).await.unwrap();
    let mut note = notes.create(json!(2)).await.unwrap();
    notes.delete(&mut note).await.unwrap();

    // A collection holding only trashed records is still listed.
    assert_eq!(instance.collections().await.unwrap(), ["notes", "tasks"]);
}

#[tokio::test]
async fn handles_on_the_same_name_share_state() {
    let instance = test_instance().await;
    let first = instance.collection("tasks").unwrap();
    let second = instance.clone().collection("tasks").unwrap();

    first.create_with_id("a", json!(null)).await.unwrap();
    let mut b = second.create_with_id("b", json!(null)).await.unwrap();
    second.move_to_top(&mut b).await.unwrap();

    assert_order(&first, &["b", "a"]).await;
}
