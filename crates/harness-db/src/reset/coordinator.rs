//! Reset coordinator

use bson::{Document, doc};
use futures::future::join_all;
use std::sync::Arc;

use super::collections::CollectionName;
use super::outcome::{CollectionFailure, ResetOutcome};
use crate::connection::{ConnectionHandle, ConnectionManager};
use crate::error::{ResetError, StoreError};
use crate::settings::ResetSettings;

/// Brings the whitelisted collections back to a clean baseline
///
/// # Examples
///
/// ```
/// use bson::doc;
/// use harness_db::backends::MemoryBackend;
/// use harness_db::connection::{ConnectionManager, RetryPolicy};
/// use harness_db::reset::{CollectionResetCoordinator, ResetOutcome};
/// use harness_db::settings::{ConnectionSettings, ResetSettings};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let backend = MemoryBackend::new();
/// backend.insert("users", doc! { "type": "admin" });
/// backend.insert("users", doc! { "type": "family" });
///
/// let manager = Arc::new(ConnectionManager::new(
/// 	Arc::new(backend.clone()),
/// 	ConnectionSettings::default(),
/// ));
/// manager.connect(RetryPolicy::default()).await.unwrap();
///
/// let coordinator = CollectionResetCoordinator::new(manager, ResetSettings::default());
/// assert_eq!(coordinator.reset_all().await, Ok(ResetOutcome::Success));
/// assert_eq!(backend.count("users"), 1);
/// # });
/// ```
pub struct CollectionResetCoordinator {
	manager: Arc<ConnectionManager>,
	settings: ResetSettings,
}

impl CollectionResetCoordinator {
	/// Create a coordinator that purges through `manager`'s connection
	///
	/// `settings` decide which `users` documents count as administrators.
	pub fn new(manager: Arc<ConnectionManager>, settings: ResetSettings) -> Self {
		Self { manager, settings }
	}

	/// Manager whose connection the purges run on
	pub fn manager(&self) -> &Arc<ConnectionManager> {
		&self.manager
	}

	/// Delete every document in `name`
	///
	/// Resolves to `Ok(false)` without a connection, so teardown paths that run
	/// after `dispose` stay quiet.
	pub async fn purge_collection(&self, name: CollectionName) -> Result<bool, StoreError> {
		let Some(handle) = self.manager.connection_handle() else {
			tracing::debug!(collection = %name, "no connection, skipping purge");
			return Ok(false);
		};

		self.purge(&handle, name, Document::new()).await?;
		Ok(true)
	}

	/// Delete every user whose discriminator is not the admin role
	///
	/// Seeded admin accounts survive so later suites can still authenticate.
	/// Same no-connection contract as [`purge_collection`](Self::purge_collection).
	pub async fn purge_users_preserving_admins(&self) -> Result<bool, StoreError> {
		let Some(handle) = self.manager.connection_handle() else {
			tracing::debug!(collection = %CollectionName::Users, "no connection, skipping purge");
			return Ok(false);
		};

		self.purge(&handle, CollectionName::Users, self.non_admin_filter())
			.await?;
		Ok(true)
	}

	/// Purge every whitelisted collection that exists
	///
	/// Collections are purged concurrently and each failure is recorded
	/// without stopping the others. Failures are reported in the order the
	/// datastore listed the collections.
	///
	/// # Errors
	///
	/// [`ResetError::NotConnected`] without a connection and
	/// [`ResetError::Enumeration`] when the collection listing fails; in both
	/// cases nothing was purged.
	pub async fn reset_all(&self) -> Result<ResetOutcome, ResetError> {
		let handle = self
			.manager
			.connection_handle()
			.ok_or(ResetError::NotConnected)?;

		let candidates = CollectionName::ALL.map(|name| name.as_str());
		let existing: Vec<CollectionName> = handle
			.session()
			.existing_collections(&candidates)
			.await
			.map_err(ResetError::Enumeration)?
			.iter()
			.filter_map(|name| name.parse().ok())
			.collect();

		let results = join_all(existing.iter().map(|&name| {
			let filter = self.filter_for(name);
			let handle = &handle;
			async move { self.purge(handle, name, filter).await }
		}))
		.await;

		let failures: Vec<CollectionFailure> = existing
			.into_iter()
			.zip(results)
			.filter_map(|(name, result)| {
				result
					.err()
					.map(|err| CollectionFailure::new(name, err.to_string()))
			})
			.collect();

		if !failures.is_empty() {
			tracing::warn!(
				failed = failures.len(),
				collections = ?failures.iter().map(|f| f.collection.as_str()).collect::<Vec<_>>(),
				"collection reset finished with failures"
			);
		}

		Ok(ResetOutcome::from_failures(failures))
	}

	fn filter_for(&self, name: CollectionName) -> Document {
		match name {
			CollectionName::Users => self.non_admin_filter(),
			_ => Document::new(),
		}
	}

	fn non_admin_filter(&self) -> Document {
		let mut filter = Document::new();
		filter.insert(
			self.settings.discriminator_key.clone(),
			doc! { "$ne": self.settings.admin_role.clone() },
		);
		filter
	}

	async fn purge(
		&self,
		handle: &ConnectionHandle,
		name: CollectionName,
		filter: Document,
	) -> Result<u64, StoreError> {
		match handle.session().delete_many(name.as_str(), filter).await {
			Ok(deleted) => {
				tracing::debug!(collection = %name, deleted, "collection purged");
				Ok(deleted)
			}
			Err(err) => {
				tracing::warn!(collection = %name, error = %err, "collection purge failed");
				Err(err)
			}
		}
	}
}
