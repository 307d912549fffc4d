//! MongoDB container fixtures
//!
//! Starts a throwaway `mongo:7.0` container per test and wires a
//! [`ConnectionManager`] to it through the real driver.

use harness_db::backends::MongoBackend;
use harness_db::connection::{ConnectionManager, RetryPolicy};
use harness_db::settings::ConnectionSettings;
use rstest::*;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

use super::TEST_URL_ENV;

/// Running MongoDB container and its connection string
pub struct MongoContainer {
	pub container: ContainerAsync<GenericImage>,
	pub url: String,
	pub port: u16,
}

async fn try_start_mongodb_container() -> Result<MongoContainer, Box<dyn std::error::Error>> {
	let mongo = GenericImage::new("mongo", "7.0")
		.with_exposed_port(27017.tcp())
		.with_wait_for(WaitFor::message_on_stdout("Waiting for connections"))
		.with_startup_timeout(Duration::from_secs(60))
		.start()
		.await?;

	let port = mongo.get_host_port_ipv4(27017).await?;
	let url = format!("mongodb://127.0.0.1:{}/harness_test", port);

	Ok(MongoContainer {
		container: mongo,
		url,
		port,
	})
}

/// Fixture providing a MongoDB container
#[fixture]
pub async fn mongodb_container() -> MongoContainer {
	const MAX_RETRIES: u32 = 3;
	const RETRY_DELAY_MS: u64 = 2000;

	let mut last_error = None;

	for attempt in 0..MAX_RETRIES {
		match try_start_mongodb_container().await {
			Ok(container) => return container,
			Err(e) => {
				tracing::warn!(
					attempt = attempt + 1,
					max_attempts = MAX_RETRIES,
					error = %e,
					"MongoDB container start failed"
				);
				last_error = Some(e.to_string());

				if attempt < MAX_RETRIES - 1 {
					tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
				}
			}
		}
	}

	panic!(
		"Failed to start MongoDB container after {} attempts: {:?}",
		MAX_RETRIES, last_error
	);
}

/// Manager connected to a fresh MongoDB container
#[fixture]
pub async fn mongodb_manager(
	#[future] mongodb_container: MongoContainer,
) -> (MongoContainer, Arc<ConnectionManager>) {
	crate::logging::init_test_logging();

	let container = mongodb_container.await;
	let settings = ConnectionSettings::default()
		.with_url_env(TEST_URL_ENV)
		.with_default_url(container.url.clone())
		.with_bootstrap_interval(Duration::from_millis(500));

	let manager = Arc::new(ConnectionManager::new(
		Arc::new(MongoBackend::new()),
		settings,
	));
	manager
		.connect(RetryPolicy::new(5, 500).expect("valid retry policy"))
		.await
		.expect("Failed to connect to MongoDB container");

	(container, manager)
}
