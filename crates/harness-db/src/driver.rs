//! Driver seam between the lifecycle manager and a concrete datastore client
//!
//! A driver opens sessions; a session runs the handful of operations the
//! harness needs. Drivers own reconnection after a session is established and
//! report transport health through a [`TransportMonitor`].

use async_trait::async_trait;
use bson::Document;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::connection::RetryPolicy;
use crate::error::Result;

/// Transport-level health signal reported by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSignal {
	/// The transport is reachable (initially, or after a recovery)
	Up,
	/// The transport dropped, or a reconnection attempt failed
	Down,
}

/// Fire-and-forget sink for [`TransportSignal`]s
///
/// Sending never blocks. Signals sent after the receiving side is gone are
/// dropped silently.
#[derive(Debug, Clone)]
pub struct TransportMonitor {
	tx: mpsc::UnboundedSender<TransportSignal>,
}

impl TransportMonitor {
	/// Create a monitor and the receiver that observes it
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportSignal>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}

	pub fn report(&self, signal: TransportSignal) {
		let _ = self.tx.send(signal);
	}

	/// Whether anyone still listens to this monitor
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

/// Opens sessions against a datastore
#[async_trait]
pub trait DocumentStoreDriver: Send + Sync {
	/// Open one logical session against `url`
	///
	/// `policy` configures the driver's own reconnection once the session is up.
	/// The driver reports transport changes for the session through `monitor`.
	async fn open(
		&self,
		url: &str,
		policy: &RetryPolicy,
		monitor: TransportMonitor,
	) -> Result<Arc<dyn StoreSession>>;
}

/// A live session against a datastore
#[async_trait]
pub trait StoreSession: Send + Sync {
	/// Names among `candidates` that currently exist, in the store's own order
	async fn existing_collections(&self, candidates: &[&str]) -> Result<Vec<String>>;

	/// Delete every document in `collection` matching `filter` in one bulk call
	///
	/// Returns the number of deleted documents.
	async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64>;

	/// Close the session gracefully
	async fn close(&self) -> Result<()>;
}
