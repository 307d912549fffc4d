//! MongoDB backend over the official driver
//!
//! The driver reconnects on its own once a client exists. This backend maps
//! the retry interval onto the heartbeat frequency and relays heartbeat
//! outcomes to the lifecycle manager as transport signals.

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use mongodb::event::EventHandler;
use mongodb::event::sdam::SdamEvent;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use std::sync::Arc;
use std::time::Duration;

use crate::connection::RetryPolicy;
use crate::driver::{DocumentStoreDriver, StoreSession, TransportMonitor, TransportSignal};
use crate::error::Result;

/// Smallest heartbeat frequency the driver accepts
const MIN_HEARTBEAT: Duration = Duration::from_millis(500);

/// Database used when the connection string names none
const FALLBACK_DATABASE: &str = "test";

/// Driver for MongoDB deployments
///
/// # Example
///
/// ```rust,no_run
/// use harness_db::backends::MongoBackend;
/// use harness_db::connection::{ConnectionManager, RetryPolicy};
/// use harness_db::settings::ConnectionSettings;
/// use std::sync::Arc;
///
/// # async fn example() {
/// let manager = ConnectionManager::new(
/// 	Arc::new(MongoBackend::new()),
/// 	ConnectionSettings::default(),
/// );
/// manager.connect(RetryPolicy::new(10, 1000).unwrap()).await.unwrap();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MongoBackend {
	server_selection_timeout: Duration,
	app_name: String,
}

impl Default for MongoBackend {
	fn default() -> Self {
		Self {
			server_selection_timeout: Duration::from_secs(5),
			app_name: "harness-db".to_string(),
		}
	}
}

impl MongoBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// How long one open attempt waits for a reachable server
	pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
		self.server_selection_timeout = timeout;
		self
	}

	pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
		self.app_name = app_name.into();
		self
	}
}

#[async_trait]
impl DocumentStoreDriver for MongoBackend {
	async fn open(
		&self,
		url: &str,
		policy: &RetryPolicy,
		monitor: TransportMonitor,
	) -> Result<Arc<dyn StoreSession>> {
		let mut options = ClientOptions::parse(url).await?;

		options.heartbeat_freq = Some(policy.retry_interval().max(MIN_HEARTBEAT));
		options.server_selection_timeout = Some(self.server_selection_timeout);
		if options.app_name.is_none() {
			options.app_name = Some(self.app_name.clone());
		}
		options.sdam_event_handler = Some(EventHandler::callback(move |event: SdamEvent| {
			match event {
				SdamEvent::ServerHeartbeatSucceeded(_) => monitor.report(TransportSignal::Up),
				SdamEvent::ServerHeartbeatFailed(_) => monitor.report(TransportSignal::Down),
				_ => {}
			}
		}));

		let client = Client::with_options(options)?;
		let database = client
			.default_database()
			.unwrap_or_else(|| client.database(FALLBACK_DATABASE));

		// Clients connect lazily; a ping proves the server is reachable
		if let Err(err) = database.run_command(doc! { "ping": 1 }).await {
			client.shutdown().await;
			return Err(err.into());
		}

		Ok(Arc::new(MongoSession { client, database }))
	}
}

struct MongoSession {
	client: Client,
	database: Database,
}

#[async_trait]
impl StoreSession for MongoSession {
	async fn existing_collections(&self, candidates: &[&str]) -> Result<Vec<String>> {
		let names: Vec<Bson> = candidates
			.iter()
			.map(|name| Bson::String((*name).to_string()))
			.collect();

		Ok(self
			.database
			.list_collection_names()
			.filter(doc! { "name": { "$in": names } })
			.await?)
	}

	async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64> {
		let result = self
			.database
			.collection::<Document>(collection)
			.delete_many(filter)
			.await?;

		Ok(result.deleted_count)
	}

	async fn close(&self) -> Result<()> {
		self.client.clone().shutdown().await;
		Ok(())
	}
}
