//! Query helpers and the density invariant over longer operation sequences.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::json;
use sortable::{PositionAccessor, backend::SortOrder};

use crate::helpers::*;

#[tokio::test]
async fn sorted_and_reversed() {
    let (_instance, tasks, _) = seeded(3).await;

    let ascending: Vec<_> = tasks
        .sorted(SortOrder::Ascending)
        .await
        .unwrap()
        .iter()
        .map(|record| record.id().to_string())
        .collect();
    assert_eq!(ascending, ["r1", "r2", "r3"]);

    let descending: Vec<_> = tasks
        .reversed()
        .await
        .unwrap()
        .iter()
        .map(|record| record.id().to_string())
        .collect();
    assert_eq!(descending, ["r3", "r2", "r1"]);
}

#[tokio::test]
async fn lookups_by_position() {
    let (_instance, tasks, mut records) = seeded(3).await;

    let at_two = tasks.at_position(2).await.unwrap();
    assert_eq!(at_two.len(), 1);
    assert_eq!(at_two[0].id().as_str(), "r2");

    assert_eq!(
        tasks.find_at_position(3).await.unwrap().unwrap().id().as_str(),
        "r3"
    );
    assert!(tasks.find_at_position(4).await.unwrap().is_none());
    assert!(tasks.find_at_position(0).await.unwrap().is_none());

    // Trashed records keep their stored position but are not found there.
    tasks.delete(&mut records[2]).await.unwrap();
    assert!(tasks.find_at_position(3).await.unwrap().is_none());
}

#[tokio::test]
async fn counts_ignore_trashed_records() {
    let (_instance, tasks, mut records) = seeded(4).await;
    assert_eq!(tasks.count().await.unwrap(), 4);
    assert_eq!(tasks.max_position().await.unwrap(), 4);

    tasks.delete(&mut records[3]).await.unwrap();
    assert_eq!(tasks.count().await.unwrap(), 3);
    assert_eq!(tasks.max_position().await.unwrap(), 3);
}

#[tokio::test]
async fn empty_collection() {
    let instance = test_instance().await;
    let tasks = instance.collection("empty").unwrap();

    assert_eq!(tasks.count().await.unwrap(), 0);
    assert_eq!(tasks.max_position().await.unwrap(), 0);
    assert!(tasks.sorted(SortOrder::Ascending).await.unwrap().is_empty());
    assert!(tasks.get("missing").await.unwrap().is_none());
    tasks.verify_density().await.unwrap();
}

#[tokio::test]
async fn collections_are_independent() {
    let (instance, tasks, mut records) = seeded(3).await;
    let other = instance.collection("other").unwrap();
    let first = other.create(json!("a")).await.unwrap();
    let second = other.create(json!("b")).await.unwrap();

    tasks.move_to_end(&mut records[0]).await.unwrap();
    tasks.delete(&mut records[1]).await.unwrap();

    assert_eq!(first.position(), Some(1));
    assert_eq!(second.position(), Some(2));
    assert_eq!(
        ids_in_order(&other).await,
        [first.id().to_string(), second.id().to_string()]
    );
    assert_order(&tasks, &["r3", "r1"]).await;
}

#[tokio::test]
async fn random_operation_sequences_keep_the_collection_dense() {
    let (_instance, tasks, _) = seeded(8).await;
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for step in 0..60 {
        let live = tasks.sorted(SortOrder::Ascending).await.unwrap();
        let trashed = tasks.trashed().await.unwrap();
        let pick = |n: usize, rng: &mut StdRng| rng.gen_range(0..n);

        match rng.gen_range(0..7) {
            0 if step % 2 == 0 => {
                tasks.create(json!({ "step": step })).await.unwrap();
            }
            0 => {
                // The current last slot, or 1 when empty.
                let position = live.len().max(1) as i64;
                tasks.insert_at(position, json!({ "step": step })).await.unwrap();
            }
            1 => {
                let position = rng.gen_range(-2..=live.len() as i64 + 3);
                tasks.insert_at(position, json!({ "step": step })).await.unwrap();
            }
            2 | 3 if !live.is_empty() => {
                let mut record = live[pick(live.len(), &mut rng)].clone();
                let position = rng.gen_range(-2..=live.len() as i64 + 3);
                tasks.move_to(&mut record, position).await.unwrap();
            }
            4 if live.len() > 1 => {
                let mut record = live[pick(live.len(), &mut rng)].clone();
                let other = live[pick(live.len(), &mut rng)].clone();
                tasks.swap_position(&mut record, &other).await.unwrap();
            }
            5 if !live.is_empty() => {
                let mut record = live[pick(live.len(), &mut rng)].clone();
                if rng.gen_bool(0.5) {
                    tasks.delete(&mut record).await.unwrap();
                } else {
                    tasks.force_delete(record).await.unwrap();
                }
            }
            6 if !trashed.is_empty() => {
                let mut record = trashed[pick(trashed.len(), &mut rng)].clone();
                tasks.restore(&mut record).await.unwrap();
            }
            _ => {}
        }

        assert_dense(&tasks).await;
    }
}
