//! Connection state and the opaque connection handle

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::driver::StoreSession;

/// Lifecycle state of the managed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
	#[default]
	Disconnected,
	Connecting,
	Connected,
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConnectionState::Disconnected => write!(f, "disconnected"),
			ConnectionState::Connecting => write!(f, "connecting"),
			ConnectionState::Connected => write!(f, "connected"),
		}
	}
}

/// Opaque handle on the live session
///
/// Only the manager creates handles. Outside this crate a handle can be
/// inspected but not used to talk to the datastore.
#[derive(Clone)]
pub struct ConnectionHandle {
	id: Uuid,
	connected_at: DateTime<Utc>,
	session: Arc<dyn StoreSession>,
}

impl ConnectionHandle {
	pub(crate) fn new(session: Arc<dyn StoreSession>) -> Self {
		Self {
			id: Uuid::new_v4(),
			connected_at: Utc::now(),
			session,
		}
	}

	/// Unique identifier of this connection
	pub fn id(&self) -> Uuid {
		self.id
	}

	/// When the connection was established
	pub fn connected_at(&self) -> DateTime<Utc> {
		self.connected_at
	}

	pub(crate) fn session(&self) -> &Arc<dyn StoreSession> {
		&self.session
	}
}

impl fmt::Debug for ConnectionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConnectionHandle")
			.field("id", &self.id)
			.field("connected_at", &self.connected_at)
			.finish_non_exhaustive()
	}
}
