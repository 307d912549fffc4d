//! Error types for datastore lifecycle and reset operations
//!
//! Driver failures are reported as [`StoreError`]. The lifecycle manager and the
//! reset coordinator wrap them into their own error types so callers can tell
//! "could not attempt" apart from "attempted and partially failed".

use std::time::Duration;

use crate::reset::CollectionFailure;

/// Result type for driver-level operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error raised by a datastore driver or session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
	/// The datastore could not be reached or the transport failed
	#[error("Connection error: {0}")]
	Connection(String),

	/// The datastore rejected or failed an operation
	#[error("Execution error: {0}")]
	Execution(String),

	/// The filter document uses an operator the backend cannot evaluate
	#[error("Invalid filter: {0}")]
	InvalidFilter(String),

	/// The session was used after it was closed
	#[error("Session closed")]
	Closed,

	/// Authentication against the datastore failed
	#[error("Authentication error: {0}")]
	Authentication(String),
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StoreError {
	fn from(err: mongodb::error::Error) -> Self {
		use mongodb::error::ErrorKind;

		match *err.kind {
			ErrorKind::Authentication { .. } => StoreError::Authentication(err.to_string()),
			ErrorKind::InvalidArgument { .. } => StoreError::InvalidFilter(err.to_string()),
			ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } => {
				StoreError::Connection(err.to_string())
			}
			_ => StoreError::Execution(err.to_string()),
		}
	}
}

/// Error returned by [`ConnectionManager::connect`](crate::connection::ConnectionManager::connect)
///
/// Bootstrap failures are retried and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
	/// The bootstrap loop was torn down by `dispose` before a connection was made
	#[error("connection attempt cancelled")]
	Cancelled,

	/// The configured bootstrap deadline elapsed
	#[error("datastore still unreachable after {attempts} attempts ({elapsed:?})")]
	BootstrapTimedOut { attempts: u32, elapsed: Duration },
}

/// Error returned by the reset coordinator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResetError {
	/// No live connection, nothing was attempted
	#[error("no active datastore connection")]
	NotConnected,

	/// Listing the existing collections failed, nothing was purged
	#[error("failed to list collections: {0}")]
	Enumeration(#[source] StoreError),

	/// One or more collections failed to purge; the rest were attempted
	#[error("reset failed for {}", describe_failures(.0))]
	PartialFailure(Vec<CollectionFailure>),
}

fn describe_failures(failures: &[CollectionFailure]) -> String {
	failures
		.iter()
		.map(|f| format!("{} ({})", f.collection, f.message))
		.collect::<Vec<_>>()
		.join(", ")
}

/// Error raised while loading or validating settings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
	#[error("File error: {0}")]
	FileError(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Unsupported format: {0}")]
	UnsupportedFormat(String),

	#[error("Validation error: {0}")]
	ValidationError(String),
}
