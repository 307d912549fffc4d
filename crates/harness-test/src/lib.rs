//! # Harness Test
//!
//! Test utilities for code that drives `harness-db`.
//!
//! - [`fixtures`]: rstest fixtures for backends, settings and connected managers
//! - [`seed`]: helpers that populate the whitelisted collections
//! - [`logging`]: one-time tracing setup for test binaries

pub mod fixtures;
pub mod logging;
pub mod seed;

pub use fixtures::{
	connected_manager, coordinator, fast_settings, memory_backend, wait_for_state,
};
pub use logging::init_test_logging;
pub use seed::{SeedReport, seed_documents, seed_users};
