//! rstest fixtures for harness-db
//!
//! Fixtures return fresh instances per test. [`MemoryBackend`] clones share
//! data, so fixtures hand back the backend next to whatever owns a clone of
//! it; tests seed and inspect through that copy.

#[cfg(feature = "testcontainers")]
pub mod testcontainers;

#[cfg(feature = "testcontainers")]
pub use self::testcontainers::{MongoContainer, mongodb_container, mongodb_manager};

use harness_db::backends::MemoryBackend;
use harness_db::connection::{ConnectionManager, ConnectionState, RetryPolicy};
use harness_db::reset::CollectionResetCoordinator;
use harness_db::settings::{ConnectionSettings, HarnessSettings};
use rstest::*;
use std::sync::Arc;
use std::time::Duration;

use crate::logging::init_test_logging;

/// Environment variable the test settings read the URL from
///
/// Kept separate from `DATABASE_URL` so a developer's shell cannot redirect
/// in-memory tests.
pub const TEST_URL_ENV: &str = "HARNESS_TEST_DATABASE_URL";

/// Empty in-memory backend
#[fixture]
pub fn memory_backend() -> MemoryBackend {
	MemoryBackend::new()
}

/// Settings with a short bootstrap interval for tests
#[fixture]
pub fn fast_settings() -> HarnessSettings {
	let mut settings = HarnessSettings::default();
	settings.connection = ConnectionSettings::default()
		.with_url_env(TEST_URL_ENV)
		.with_default_url("memory://harness")
		.with_bootstrap_interval(Duration::from_millis(100));
	settings
}

/// Manager already connected to a fresh in-memory backend
#[fixture]
pub async fn connected_manager(
	memory_backend: MemoryBackend,
	fast_settings: HarnessSettings,
) -> (MemoryBackend, Arc<ConnectionManager>) {
	init_test_logging();

	let manager = Arc::new(ConnectionManager::new(
		Arc::new(memory_backend.clone()),
		fast_settings.connection,
	));
	manager
		.connect(RetryPolicy::default())
		.await
		.expect("Failed to connect to in-memory backend");

	(memory_backend, manager)
}

/// Reset coordinator over a connected in-memory backend
#[fixture]
pub async fn coordinator(
	#[future] connected_manager: (MemoryBackend, Arc<ConnectionManager>),
	fast_settings: HarnessSettings,
) -> (MemoryBackend, CollectionResetCoordinator) {
	let (backend, manager) = connected_manager.await;
	(
		backend,
		CollectionResetCoordinator::new(manager, fast_settings.reset),
	)
}

/// Wait until `manager` reaches `state`, giving up after five seconds
///
/// Returns whether the state was reached.
pub async fn wait_for_state(manager: &ConnectionManager, state: ConnectionState) -> bool {
	let mut rx = manager.watch_state();
	let reached = async move { rx.wait_for(|s| *s == state).await.is_ok() };
	tokio::time::timeout(Duration::from_secs(5), reached)
		.await
		.unwrap_or(false)
}
