//! Shared helpers for the reactor integration tests.
//!
//! - [`builders`]: config and graph builders.
//! - [`fake_executor`]: a scripted executor that records timings.
//! - [`recording`]: event sinks and calculator wrappers.

pub mod builders;
pub mod fake_executor;
pub mod recording;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use reactor::logging::{LOG_ENV_VAR, filter_from_env};
use tracing_subscriber::fmt;

static INIT: Once = Once::new();

/// Upper bound for a single test build.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialise tracing for tests, filtered by `REACTOR_LOG` like the binary.
///
/// Output goes through `with_test_writer()`, so it only shows for failing
/// tests unless run with `-- --nocapture`.
///
/// e.g. `REACTOR_LOG=reactor::engine=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = filter_from_env(std::env::var(LOG_ENV_VAR).ok().as_deref());

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_ids(true)
            .init();
    });
}

/// Run a future, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test timed out after {TEST_TIMEOUT:?}; likely a scheduler deadlock"),
    }
}
