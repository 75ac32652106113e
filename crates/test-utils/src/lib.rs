//! Shared fixtures for `tpc` integration tests: settings builders, a
//! recording executor that stands in for `gcloud`, and tracing setup.

pub mod builders;
pub mod recording_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Upper bound for a single workflow under test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialise tracing once per test binary.
///
/// Output goes through the test writer, so it only shows for failing tests
/// (or with `-- --nocapture`). `RUST_LOG` overrides the `tpc=debug` default.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tpc=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .expect("workflow under test timed out")
}
