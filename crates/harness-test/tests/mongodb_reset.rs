//! Reset against a real MongoDB deployment
//!
//! Requires Docker. Run with `--features testcontainers`.

use bson::{Document, doc};
use harness_db::connection::{ConnectionManager, ConnectionState};
use harness_db::reset::{CollectionName, CollectionResetCoordinator, ResetOutcome};
use harness_db::settings::ResetSettings;
use harness_test::fixtures::testcontainers::{MongoContainer, mongodb_manager};
use harness_test::seed::user_document;
use mongodb::Client;
use rstest::*;
use serial_test::serial;
use std::sync::Arc;

async fn database(container: &MongoContainer) -> mongodb::Database {
	let client = Client::with_uri_str(&container.url)
		.await
		.expect("Failed to create MongoDB client");
	client.database("harness_test")
}

#[rstest]
#[tokio::test]
#[serial(mongodb)]
async fn test_reset_all_against_mongodb(
	#[future] mongodb_manager: (MongoContainer, Arc<ConnectionManager>),
) {
	// Arrange
	let (container, manager) = mongodb_manager.await;
	let db = database(&container).await;
	let settings = ResetSettings::default();

	db.collection::<Document>("institutions")
		.insert_many([doc! { "name": "north" }, doc! { "name": "south" }])
		.await
		.unwrap();
	db.collection::<Document>("childrengroups")
		.insert_one(doc! { "name": "group-a" })
		.await
		.unwrap();
	db.collection::<Document>("users")
		.insert_many([
			user_document(&settings, "admin", "admin@example.com"),
			user_document(&settings, "child", "kid@example.com"),
			user_document(&settings, "family", "fam@example.com"),
		])
		.await
		.unwrap();
	db.collection::<Document>("sessions")
		.insert_one(doc! { "token": "keep" })
		.await
		.unwrap();

	let coordinator = CollectionResetCoordinator::new(Arc::clone(&manager), settings);

	// Act
	let outcome = coordinator.reset_all().await;

	// Assert
	assert_eq!(outcome, Ok(ResetOutcome::Success));
	let count = |name: &'static str| {
		let collection = db.collection::<Document>(name);
		async move { collection.count_documents(doc! {}).await.unwrap() }
	};
	assert_eq!(count(CollectionName::Institutions.as_str()).await, 0);
	assert_eq!(count(CollectionName::ChildrenGroups.as_str()).await, 0);
	assert_eq!(count(CollectionName::Users.as_str()).await, 1);
	assert_eq!(count("sessions").await, 1);

	manager.dispose().await;
}

#[rstest]
#[tokio::test]
#[serial(mongodb)]
async fn test_dispose_releases_mongodb_client(
	#[future] mongodb_manager: (MongoContainer, Arc<ConnectionManager>),
) {
	// Arrange
	let (_container, manager) = mongodb_manager.await;
	assert_eq!(manager.state(), ConnectionState::Connected);

	// Act
	manager.dispose().await;

	// Assert
	assert_eq!(manager.state(), ConnectionState::Disconnected);
	assert!(manager.connection_handle().is_none());
}
