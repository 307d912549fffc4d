//! # Harness Store
//!
//! Backing-store preparation for integration-test harnesses.
//!
//! This facade re-exports the workspace crates:
//!
//! - [`db`]: connection lifecycle, collection reset and datastore backends
//! - [`testing`]: rstest fixtures and seed helpers (`test` feature)
//!
//! ## Feature Flags
//!
//! - `mongodb` - MongoDB backend over the official driver
//! - `test` - Fixtures and seed helpers
//! - `testcontainers` - Container-backed MongoDB fixtures (requires Docker)
//!
//! ## Quick Example
//!
//! ```
//! use harness_store::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let backend = MemoryBackend::new();
//! let settings = HarnessSettings::default();
//! let manager = Arc::new(ConnectionManager::new(
//! 	Arc::new(backend),
//! 	settings.connection.clone(),
//! ));
//! manager.connect(RetryPolicy::default()).await.unwrap();
//!
//! let reset = CollectionResetCoordinator::new(Arc::clone(&manager), settings.reset);
//! assert!(reset.reset_all().await.unwrap().is_success());
//! manager.dispose().await;
//! # });
//! ```

pub use harness_db as db;

#[cfg(feature = "test")]
pub use harness_test as testing;

pub use harness_db::{
	CollectionName, CollectionResetCoordinator, ConnectionError, ConnectionEvent,
	ConnectionManager, ConnectionState, HarnessSettings, ResetError, ResetOutcome, RetryPolicy,
	StoreError,
};

/// Re-export commonly used types
pub mod prelude {
	pub use harness_db::prelude::*;
}
