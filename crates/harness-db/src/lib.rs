//! # Harness DB
//!
//! Backing-store lifecycle for integration-test harnesses.
//!
//! This crate prepares and resets shared datastore state between test runs:
//!
//! - **Connection lifecycle** ([`connection`]): one logical connection with an
//!   unbounded bootstrap retry loop, driver-level reconnection afterwards, and
//!   `connected` / `disconnected` events for every state flip
//! - **Collection reset** ([`reset`]): purges a fixed whitelist of collections,
//!   keeps administrative users, and reports per-collection failures as one
//!   aggregated outcome
//! - **Backends** ([`backends`]): an in-process store and, with the `mongodb`
//!   feature, the official MongoDB driver
//!
//! ## Quick Start
//!
//! ```
//! use harness_db::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let settings = HarnessSettings::default();
//! let manager = Arc::new(ConnectionManager::new(
//! 	Arc::new(MemoryBackend::new()),
//! 	settings.connection.clone(),
//! ));
//! manager.connect(RetryPolicy::default()).await.unwrap();
//!
//! let coordinator = CollectionResetCoordinator::new(Arc::clone(&manager), settings.reset);
//! coordinator.reset_all().await.unwrap().into_result().unwrap();
//!
//! manager.dispose().await;
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! - `mongodb`: enables [`backends::MongoBackend`]

pub mod backends;
pub mod connection;
pub mod driver;
pub mod error;
pub mod reset;
pub mod settings;

pub use connection::{
	ConnectionEvent, ConnectionHandle, ConnectionManager, ConnectionState, RetryPolicy,
};
pub use error::{ConnectionError, ResetError, SettingsError, StoreError};
pub use reset::{CollectionFailure, CollectionName, CollectionResetCoordinator, ResetOutcome};
pub use settings::{ConnectionSettings, HarnessSettings, ResetSettings};

/// Re-export commonly used types
pub mod prelude {
	pub use super::backends::MemoryBackend;
	#[cfg(feature = "mongodb")]
	pub use super::backends::MongoBackend;
	pub use super::connection::{
		ConnectionEvent, ConnectionHandle, ConnectionManager, ConnectionState, RetryPolicy,
	};
	pub use super::driver::{DocumentStoreDriver, StoreSession, TransportMonitor, TransportSignal};
	pub use super::error::{ConnectionError, ResetError, SettingsError, StoreError};
	pub use super::reset::{
		CollectionFailure, CollectionName, CollectionResetCoordinator, ResetOutcome,
	};
	pub use super::settings::{ConnectionSettings, HarnessSettings, ResetSettings};
}
