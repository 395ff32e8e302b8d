/*! Integration tests for Sortable.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - collection: Tests for the Collection operations and the density they maintain
 * - instance: Tests for the Instance struct and collection handles
 * - backend: Tests for the backend implementations and their persistence
 *
 * Every test runs against the backend selected by TEST_BACKEND (see helpers).
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("sortable=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod collection;
mod helpers;
mod instance;
