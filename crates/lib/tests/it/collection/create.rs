//! Creation: appending and inserting new records.

use serde_json::json;
use sortable::{PositionAccessor, Record};

use crate::helpers::*;

#[tokio::test]
async fn first_record_gets_position_one() {
    let instance = test_instance().await;
    let tasks = instance.collection("tasks").unwrap();

    let record = tasks.create(json!("only")).await.unwrap();
    assert_eq!(record.position(), Some(1));
    assert!(record.is_persisted());
    assert_eq!(tasks.count().await.unwrap(), 1);
}

#[tokio::test]
async fn creation_appends_after_max_position() {
    let (_instance, tasks, _) = seeded(3).await;

    let record = tasks.create(json!("fourth")).await.unwrap();
    assert_eq!(record.position(), Some(4));
    assert_eq!(tasks.max_position().await.unwrap(), 4);
    assert_order(&tasks, &["r1", "r2", "r3", record.id().as_str()]).await;
}

#[tokio::test]
async fn create_with_taken_id_is_a_conflict() {
    let (_instance, tasks, _) = seeded(2).await;

    let err = tasks.create_with_id("r1", json!(null)).await.unwrap_err();
    assert!(err.is_conflict());
    assert_order(&tasks, &["r1", "r2"]).await;
}

#[tokio::test]
async fn insert_at_shifts_the_tail() {
    let (_instance, tasks, _) = seeded(3).await;

    let inserted = tasks.insert_at(2, json!("new")).await.unwrap();
    assert_eq!(inserted.position(), Some(2));
    assert_order(&tasks, &["r1", inserted.id().as_str(), "r2", "r3"]).await;
}

#[tokio::test]
async fn insert_at_clamps_out_of_range_positions() {
    let (_instance, tasks, _) = seeded(2).await;

    let top = tasks.insert_at(0, json!("top")).await.unwrap();
    assert_eq!(top.position(), Some(1));

    let end = tasks.insert_at(999, json!("end")).await.unwrap();
    assert_eq!(end.position(), Some(4));

    assert_order(&tasks, &[top.id().as_str(), "r1", "r2", end.id().as_str()]).await;
}

#[tokio::test]
async fn saving_a_new_record_with_a_position_inserts_it() {
    let (_instance, tasks, _) = seeded(3).await;

    let mut record = Record::with_id("tasks", "x", json!({"title": "x"}));
    record.set_position(1);
    tasks.save(&mut record).await.unwrap();

    assert_eq!(record.position(), Some(1));
    assert!(!record.position_changed());
    assert_order(&tasks, &["x", "r1", "r2", "r3"]).await;
}

#[tokio::test]
async fn payload_is_stored_with_the_position() {
    let (_instance, tasks, mut records) = seeded(2).await;

    let first = &mut records[0];
    first.set_payload(json!({"title": "renamed"}));
    tasks.save(first).await.unwrap();

    let stored = tasks.get("r1").await.unwrap().unwrap();
    assert_eq!(stored.payload(), &json!({"title": "renamed"}));
    assert_eq!(stored.position(), Some(1));
}

#[tokio::test]
async fn insert_at_the_last_slot_pushes_the_tail_record_down() {
    let (_instance, tasks, _) = seeded(3).await;

    let inserted = tasks.insert_at(3, json!("new")).await.unwrap();
    assert_eq!(inserted.position(), Some(3));
    assert_eq!(position_of(&tasks, "r3").await, 4);
    assert_order(&tasks, &["r1", "r2", inserted.id().as_str(), "r3"]).await;
    assert_dense(&tasks).await;
}

#[tokio::test]
async fn insert_at_one_into_a_single_record_collection() {
    let (_instance, tasks, _) = seeded(1).await;

    let inserted = tasks.insert_at(1, json!("first")).await.unwrap();
    assert_eq!(inserted.position(), Some(1));
    assert_order(&tasks, &[inserted.id().as_str(), "r1"]).await;
    assert_dense(&tasks).await;
}

#[tokio::test]
async fn insert_at_into_an_empty_collection_lands_on_one() {
    let instance = test_instance().await;
    let tasks = instance.collection("tasks").unwrap();

    let inserted = tasks.insert_at(1, json!("only")).await.unwrap();
    assert_eq!(inserted.position(), Some(1));

    let clamped = instance.collection("other").unwrap();
    let record = clamped.insert_at(5, json!("only")).await.unwrap();
    assert_eq!(record.position(), Some(1));
    assert_dense(&tasks).await;
    assert_dense(&clamped).await;
}

#[tokio::test]
async fn saving_a_new_record_at_the_last_slot_inserts_it() {
    let (_instance, tasks, _) = seeded(2).await;

    let mut record = Record::with_id("tasks", "x", json!(null));
    record.set_position(2);
    tasks.save(&mut record).await.unwrap();

    assert_eq!(record.position(), Some(2));
    assert_order(&tasks, &["r1", "x", "r2"]).await;
}
