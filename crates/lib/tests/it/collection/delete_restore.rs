//! Soft delete, hard delete and restore.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sortable::{Clock, Instance, PositionAccessor, reorder::ReorderError};

use crate::helpers::*;

#[tokio::test]
async fn delete_closes_the_gap() {
    let (_instance, tasks, mut records) = seeded(5).await;

    tasks.delete(&mut records[1]).await.unwrap();

    assert!(records[1].is_trashed());
    assert_eq!(tasks.count().await.unwrap(), 4);
    assert_order(&tasks, &["r1", "r3", "r4", "r5"]).await;

    let trashed = tasks.trashed().await.unwrap();
    assert_eq!(trashed.len(), 1);
    assert_eq!(trashed[0].id().as_str(), "r2");
    assert_eq!(trashed[0].position(), Some(2));
}

#[tokio::test]
async fn force_delete_closes_the_gap() {
    let (_instance, tasks, records) = seeded(4).await;

    tasks.force_delete(records[0].clone()).await.unwrap();

    assert!(tasks.get_with_trashed("r1").await.unwrap().is_none());
    assert_order(&tasks, &["r2", "r3", "r4"]).await;
}

#[tokio::test]
async fn force_deleting_a_trashed_record_moves_nothing() {
    let (_instance, tasks, mut records) = seeded(3).await;

    tasks.delete(&mut records[0]).await.unwrap();
    assert_order(&tasks, &["r2", "r3"]).await;

    tasks.force_delete(records[0].clone()).await.unwrap();
    assert!(tasks.trashed().await.unwrap().is_empty());
    assert_order(&tasks, &["r2", "r3"]).await;
}

#[tokio::test]
async fn deleting_twice_is_a_conflict() {
    let (_instance, tasks, mut records) = seeded(2).await;

    tasks.delete(&mut records[0]).await.unwrap();
    let err = tasks.delete(&mut records[0]).await.unwrap_err();
    assert!(matches!(
        err,
        sortable::Error::Reorder(ReorderError::AlreadyDeleted { .. })
    ));
}

#[tokio::test]
async fn restore_reopens_the_slot() {
    let (_instance, tasks, mut records) = seeded(4).await;

    tasks.delete(&mut records[1]).await.unwrap();
    assert_order(&tasks, &["r1", "r3", "r4"]).await;

    tasks.restore(&mut records[1]).await.unwrap();

    assert!(!records[1].is_trashed());
    assert_eq!(records[1].position(), Some(2));
    assert_eq!(position_of(&tasks, "r3").await, 3);
    assert_eq!(position_of(&tasks, "r4").await, 4);
    assert_order(&tasks, &["r1", "r2", "r3", "r4"]).await;
    assert!(tasks.trashed().await.unwrap().is_empty());
}

#[tokio::test]
async fn restore_past_the_end_lands_last() {
    let (_instance, tasks, mut records) = seeded(5).await;

    tasks.delete(&mut records[4]).await.unwrap();
    tasks.force_delete(records[0].clone()).await.unwrap();
    tasks.force_delete(records[1].clone()).await.unwrap();
    assert_order(&tasks, &["r3", "r4"]).await;

    // r5 was stored at 5 but only two records are live.
    tasks.restore(&mut records[4]).await.unwrap();
    assert_eq!(records[4].position(), Some(3));
    assert_order(&tasks, &["r3", "r4", "r5"]).await;
}

#[tokio::test]
async fn restoring_a_live_record_is_a_conflict() {
    let (_instance, tasks, mut records) = seeded(2).await;

    let err = tasks.restore(&mut records[0]).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(matches!(
        err,
        sortable::Error::Reorder(ReorderError::NotDeleted { .. })
    ));
}

#[tokio::test]
async fn trashed_records_cannot_be_saved() {
    let (_instance, tasks, mut records) = seeded(3).await;
    let mut copy = records[0].clone();
    tasks.delete(&mut records[0]).await.unwrap();

    copy.set_position(3);
    let err = tasks.save(&mut copy).await.unwrap_err();
    assert!(matches!(
        err,
        sortable::Error::Reorder(ReorderError::AlreadyDeleted { .. })
    ));
    assert_order(&tasks, &["r2", "r3"]).await;
}

/// Clock that counts up from a start value, one millisecond per reading.
#[derive(Debug)]
struct TickingClock(AtomicU64);

impl Clock for TickingClock {
    fn now_millis(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

#[tokio::test]
async fn tombstones_come_from_the_instance_clock() {
    let clock = Arc::new(TickingClock(AtomicU64::new(1_000)));
    let instance = Instance::open_with_clock(test_backend().await, clock)
        .await
        .unwrap();
    let tasks = instance.collection("tasks").unwrap();
    let mut a = tasks.create_with_id("a", serde_json::json!(null)).await.unwrap();
    let mut b = tasks.create_with_id("b", serde_json::json!(null)).await.unwrap();

    tasks.delete(&mut a).await.unwrap();
    tasks.delete(&mut b).await.unwrap();

    assert_eq!(a.deleted_at(), Some(1_000));
    assert_eq!(b.deleted_at(), Some(1_001));
    let stored = tasks.get_with_trashed("b").await.unwrap().unwrap();
    assert_eq!(stored.deleted_at(), Some(1_001));
    assert!(tasks.get("b").await.unwrap().is_none());
}
