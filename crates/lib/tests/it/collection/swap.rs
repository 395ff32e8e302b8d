//! Swapping two records' positions.

use sortable::{PositionAccessor, SwapTarget, reorder::ReorderError};

use crate::helpers::*;

#[tokio::test]
async fn swap_exchanges_exactly_two_records() {
    let (_instance, tasks, mut records) = seeded(5).await;
    let r5 = records[4].clone();

    let other = tasks.swap_position(&mut records[1], &r5).await.unwrap();

    assert_eq!(records[1].position(), Some(5));
    assert_eq!(other.id().as_str(), "r5");
    assert_eq!(other.position(), Some(2));
    assert_order(&tasks, &["r1", "r5", "r3", "r4", "r2"]).await;
}

#[tokio::test]
async fn swap_with_a_position() {
    let (_instance, tasks, mut records) = seeded(4).await;

    let other = tasks.swap_position(&mut records[0], 3_i64).await.unwrap();

    assert_eq!(other.id().as_str(), "r3");
    assert_order(&tasks, &["r3", "r2", "r1", "r4"]).await;
}

#[tokio::test]
async fn swap_with_an_empty_position_fails_without_changes() {
    let (_instance, tasks, mut records) = seeded(3).await;

    let err = tasks
        .swap_position(&mut records[0], SwapTarget::Position(7))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        sortable::Error::Reorder(ReorderError::NotFoundAtPosition { position: 7, .. })
    ));
    assert_eq!(records[0].position(), Some(1));
    assert_order(&tasks, &["r1", "r2", "r3"]).await;
}

#[tokio::test]
async fn swap_with_itself_is_a_noop() {
    let (_instance, tasks, mut records) = seeded(3).await;
    let id = records[1].id().clone();

    let other = tasks.swap_position(&mut records[1], id).await.unwrap();
    assert_eq!(other.position(), Some(2));

    let other = tasks.swap_position(&mut records[1], 2_i64).await.unwrap();
    assert_eq!(other.id(), records[1].id());
    assert_order(&tasks, &["r1", "r2", "r3"]).await;
}

#[tokio::test]
async fn swap_with_a_trashed_record_fails() {
    let (_instance, tasks, mut records) = seeded(3).await;
    let mut r3 = records[2].clone();
    tasks.delete(&mut r3).await.unwrap();

    let err = tasks.swap_position(&mut records[0], &r3).await.unwrap_err();
    assert!(err.is_conflict());
    assert_order(&tasks, &["r1", "r2"]).await;
}
