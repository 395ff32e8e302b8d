use serde_json::json;
use sortable::{
    Collection, Instance, PositionAccessor, Record, backend::BackendImpl,
    backend::database::InMemory,
};

// ==========================
// CORE TEST FACTORIES
// ==========================
// A single point of change for backend matrix testing via TEST_BACKEND env var.

/// Creates a test backend based on TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory backend (default)
/// - "sqlite": SQLite in-memory backend (requires `sqlite` feature)
/// - "postgres": PostgreSQL backend (requires `postgres` feature and TEST_POSTGRES_URL)
///
/// # Example
/// ```bash
/// # Run tests with SQLite
/// TEST_BACKEND=sqlite cargo test --features sqlite
///
/// # Run tests with PostgreSQL
/// TEST_BACKEND=postgres TEST_POSTGRES_URL="postgres://localhost/sortable_test" \
///   cargo test --features postgres
/// ```
pub async fn test_backend() -> Box<dyn BackendImpl> {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use sortable::backend::database::Sqlite;
                Box::new(
                    Sqlite::in_memory()
                        .await
                        .expect("Failed to create SQLite backend"),
                )
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("postgres") => {
            #[cfg(feature = "postgres")]
            {
                use sortable::backend::database::Postgres;
                let url = std::env::var("TEST_POSTGRES_URL")
                    .unwrap_or_else(|_| "postgres://localhost/sortable_test".to_string());
                Box::new(
                    Postgres::connect_isolated(&url)
                        .await
                        .expect("Failed to connect to PostgreSQL"),
                )
            }
            #[cfg(not(feature = "postgres"))]
            {
                panic!("TEST_BACKEND=postgres requires the 'postgres' feature to be enabled")
            }
        }
        Ok("inmemory") | Ok("") | Err(_) => Box::new(InMemory::new()),
        Ok(other) => {
            panic!("Unknown TEST_BACKEND value: {other}. Supported: inmemory, sqlite, postgres")
        }
    }
}

pub async fn test_instance() -> Instance {
    Instance::open(test_backend().await)
        .await
        .expect("Failed to create test instance")
}

/// A collection named "tasks" holding records "r1".."rN" at positions 1..N.
pub async fn seeded(count: usize) -> (Instance, Collection, Vec<Record>) {
    let instance = test_instance().await;
    let tasks = instance.collection("tasks").expect("valid name");
    let mut records = Vec::with_capacity(count);
    for n in 1..=count {
        let record = tasks
            .create_with_id(format!("r{n}"), json!({ "n": n }))
            .await
            .expect("Failed to create record");
        records.push(record);
    }
    (instance, tasks, records)
}

// ==========================
// ASSERTION HELPERS
// ==========================

/// Ids of the live records in ascending position order.
pub async fn ids_in_order(collection: &Collection) -> Vec<String> {
    collection
        .sorted(Default::default())
        .await
        .expect("Failed to list collection")
        .into_iter()
        .map(|record| record.id().to_string())
        .collect()
}

/// Stored position of a live record.
pub async fn position_of(collection: &Collection, id: &str) -> i64 {
    collection
        .get(id)
        .await
        .expect("Failed to read record")
        .unwrap_or_else(|| panic!("record {id} is not live"))
        .position()
        .unwrap_or_else(|| panic!("record {id} has no position"))
}

/// Asserts the live positions are exactly 1..=count.
pub async fn assert_dense(collection: &Collection) {
    if let Err(err) = collection.verify_density().await {
        panic!("collection is not dense: {err}; order: {:?}", ids_in_order(collection).await);
    }
}

/// Asserts the live collection is ordered exactly as `expected`.
pub async fn assert_order(collection: &Collection, expected: &[&str]) {
    assert_eq!(ids_in_order(collection).await, expected);
    assert_dense(collection).await;
}
