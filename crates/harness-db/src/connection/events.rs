//! Connection state events

use std::fmt;

/// Signal emitted on every connection state flip
///
/// Events carry no payload. Delivery is best-effort: a subscriber that falls
/// behind the channel capacity loses the oldest events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
	Connected,
	Disconnected,
}

impl fmt::Display for ConnectionEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConnectionEvent::Connected => write!(f, "connected"),
			ConnectionEvent::Disconnected => write!(f, "disconnected"),
		}
	}
}
