//! Connection manager implementation

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::events::ConnectionEvent;
use super::policy::RetryPolicy;
use super::state::{ConnectionHandle, ConnectionState};
use crate::driver::{DocumentStoreDriver, TransportMonitor, TransportSignal};
use crate::error::ConnectionError;
use crate::settings::{ConnectionSettings, mask_url_password};

/// Owns the single logical connection to the datastore
///
/// Share it behind an `Arc` with whatever needs the connection, typically a
/// [`CollectionResetCoordinator`](crate::reset::CollectionResetCoordinator).
///
/// # Examples
///
/// ```
/// use harness_db::backends::MemoryBackend;
/// use harness_db::connection::{ConnectionManager, ConnectionState, RetryPolicy};
/// use harness_db::settings::ConnectionSettings;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let manager = ConnectionManager::new(
/// 	Arc::new(MemoryBackend::new()),
/// 	ConnectionSettings::default(),
/// );
///
/// manager.connect(RetryPolicy::default()).await.unwrap();
/// assert_eq!(manager.state(), ConnectionState::Connected);
///
/// manager.dispose().await;
/// assert!(manager.connection_handle().is_none());
/// # });
/// ```
pub struct ConnectionManager {
	driver: Arc<dyn DocumentStoreDriver>,
	settings: ConnectionSettings,
	lifecycle: tokio::sync::Mutex<()>,
	shared: Arc<Shared>,
}

/// State shared with the supervisor task
struct Shared {
	state: watch::Sender<ConnectionState>,
	events: broadcast::Sender<ConnectionEvent>,
	handle: Mutex<Option<ConnectionHandle>>,
	bootstrap: Mutex<CancellationToken>,
	supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
	/// Move to `next`, emitting an event when the connected/disconnected side flips
	fn transition(&self, next: ConnectionState) {
		let previous = self.state.send_replace(next);
		if previous == next {
			return;
		}

		let event = match next {
			ConnectionState::Connected => ConnectionEvent::Connected,
			ConnectionState::Disconnected => ConnectionEvent::Disconnected,
			ConnectionState::Connecting => return,
		};
		tracing::debug!(from = %previous, to = %next, "connection state changed");
		// No subscribers is fine
		let _ = self.events.send(event);
	}

	fn is_current(&self, id: Uuid) -> bool {
		self.handle.lock().as_ref().is_some_and(|h| h.id() == id)
	}

	fn take_handle_if(&self, id: Uuid) -> Option<ConnectionHandle> {
		let mut slot = self.handle.lock();
		if slot.as_ref().is_some_and(|h| h.id() == id) {
			slot.take()
		} else {
			None
		}
	}

	fn fresh_bootstrap_token(&self) -> CancellationToken {
		let token = CancellationToken::new();
		*self.bootstrap.lock() = token.clone();
		token
	}

	fn stop_supervisor(&self) {
		if let Some(task) = self.supervisor.lock().take() {
			task.abort();
		}
	}
}

impl ConnectionManager {
	/// Create a disconnected manager that opens sessions through `driver`
	///
	/// Nothing is opened until [`connect`](Self::connect) is called.
	pub fn new(driver: Arc<dyn DocumentStoreDriver>, settings: ConnectionSettings) -> Self {
		let (state, _) = watch::channel(ConnectionState::Disconnected);
		let (events, _) = broadcast::channel(settings.event_capacity.max(1));

		Self {
			driver,
			settings,
			lifecycle: tokio::sync::Mutex::new(()),
			shared: Arc::new(Shared {
				state,
				events,
				handle: Mutex::new(None),
				bootstrap: Mutex::new(CancellationToken::new()),
				supervisor: Mutex::new(None),
			}),
		}
	}

	/// Connect to the datastore, retrying until it is reachable
	///
	/// Failed attempts are logged and retried every
	/// [`ConnectionSettings::bootstrap_interval`] with no upper bound unless a
	/// bootstrap deadline is configured. `policy` is only handed to the driver
	/// for reconnection after the first success.
	///
	/// Calling `connect` on a connected manager tears the old session down
	/// first. Calling it while another lifecycle operation runs waits for that
	/// operation instead of starting a second one, and succeeds only if it left
	/// a live connection.
	///
	/// # Errors
	///
	/// [`ConnectionError::Cancelled`] if [`dispose`](Self::dispose) stops the
	/// attempt, [`ConnectionError::BootstrapTimedOut`] if the deadline elapses.
	pub async fn connect(&self, policy: RetryPolicy) -> Result<(), ConnectionError> {
		let _guard = match self.lifecycle.try_lock() {
			Ok(guard) => guard,
			Err(_) => return self.join_in_flight().await,
		};

		let token = self.shared.fresh_bootstrap_token();
		self.teardown().await;
		self.bootstrap(policy, &token).await
	}

	/// Close the connection, if any, and return to `Disconnected`
	///
	/// Stops a bootstrap loop in progress. Close errors are logged and
	/// swallowed. Calling it with nothing to close is a no-op.
	pub async fn dispose(&self) {
		self.shared.bootstrap.lock().cancel();

		let _guard = self.lifecycle.lock().await;
		self.teardown().await;
	}

	/// Current handle, if connected
	///
	/// Reflects the state at the time of the call; await
	/// [`connect`](Self::connect) rather than polling this.
	pub fn connection_handle(&self) -> Option<ConnectionHandle> {
		self.shared.handle.lock().clone()
	}

	/// Current lifecycle state
	pub fn state(&self) -> ConnectionState {
		*self.shared.state.borrow()
	}

	/// Whether the state is [`ConnectionState::Connected`]
	pub fn is_connected(&self) -> bool {
		self.state() == ConnectionState::Connected
	}

	/// Watch state changes
	pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
		self.shared.state.subscribe()
	}

	/// Subscribe to `connected` / `disconnected` events
	pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
		self.shared.events.subscribe()
	}

	/// Settings this manager was created with
	pub fn settings(&self) -> &ConnectionSettings {
		&self.settings
	}

	/// Wait for the lifecycle operation holding the lock, then report its result
	async fn join_in_flight(&self) -> Result<(), ConnectionError> {
		let _guard = self.lifecycle.lock().await;

		if self.shared.handle.lock().is_some() {
			Ok(())
		} else {
			Err(ConnectionError::Cancelled)
		}
	}

	async fn bootstrap(
		&self,
		policy: RetryPolicy,
		token: &CancellationToken,
	) -> Result<(), ConnectionError> {
		let url = self.settings.resolve_url();
		let display_url = mask_url_password(&url);
		let interval = self.settings.bootstrap_interval();
		let deadline = self.settings.bootstrap_deadline();
		let started = Instant::now();
		let mut attempts: u32 = 0;

		loop {
			attempts += 1;
			self.shared.transition(ConnectionState::Connecting);

			let (monitor, signals) = TransportMonitor::channel();
			let opened = tokio::select! {
				biased;
				_ = token.cancelled() => {
					self.shared.transition(ConnectionState::Disconnected);
					return Err(ConnectionError::Cancelled);
				}
				opened = self.driver.open(&url, &policy, monitor) => opened,
			};

			match opened {
				Ok(session) => {
					let handle = ConnectionHandle::new(session);
					tracing::info!(
						url = %display_url,
						connection_id = %handle.id(),
						attempts,
						"connected to datastore"
					);
					let id = handle.id();
					*self.shared.handle.lock() = Some(handle);
					self.shared.transition(ConnectionState::Connected);

					let task = tokio::spawn(supervise(
						Arc::clone(&self.shared),
						id,
						policy,
						signals,
					));
					*self.shared.supervisor.lock() = Some(task);
					return Ok(());
				}
				Err(err) => {
					self.shared.handle.lock().take();
					self.shared.transition(ConnectionState::Disconnected);
					tracing::warn!(
						url = %display_url,
						attempt = attempts,
						error = %err,
						"datastore unavailable, retrying in {:?}",
						interval
					);
				}
			}

			if let Some(deadline) = deadline {
				let elapsed = started.elapsed();
				if elapsed >= deadline {
					return Err(ConnectionError::BootstrapTimedOut { attempts, elapsed });
				}
			}

			tokio::select! {
				biased;
				_ = token.cancelled() => return Err(ConnectionError::Cancelled),
				_ = tokio::time::sleep(interval) => {}
			}
		}
	}

	/// Stop supervision, settle on `Disconnected`, and close the session
	async fn teardown(&self) {
		self.shared.stop_supervisor();

		let handle = self.shared.handle.lock().take();
		// Observers must not see the old session as connected while it closes
		self.shared.transition(ConnectionState::Disconnected);

		if let Some(handle) = handle {
			match handle.session().close().await {
				Ok(()) => tracing::info!(connection_id = %handle.id(), "datastore connection closed"),
				Err(err) => tracing::warn!(
					connection_id = %handle.id(),
					error = %err,
					"failed to close datastore connection"
				),
			}
		}
	}
}

impl Drop for ConnectionManager {
	fn drop(&mut self) {
		self.shared.bootstrap.lock().cancel();
		self.shared.stop_supervisor();
	}
}

/// Relay transport signals for one connection until it is replaced or given up
async fn supervise(
	shared: Arc<Shared>,
	id: Uuid,
	policy: RetryPolicy,
	mut signals: mpsc::UnboundedReceiver<TransportSignal>,
) {
	let mut failures: u32 = 0;

	while let Some(signal) = signals.recv().await {
		if !shared.is_current(id) {
			break;
		}

		tracing::debug!(connection_id = %id, ?signal, "transport signal");
		match signal {
			TransportSignal::Up => {
				failures = 0;
				shared.transition(ConnectionState::Connected);
			}
			TransportSignal::Down => {
				failures += 1;
				shared.transition(ConnectionState::Disconnected);

				if policy.exhausted(failures) {
					tracing::error!(
						connection_id = %id,
						max_retries = policy.max_retries(),
						"reconnection attempts exhausted, giving up on connection"
					);
					if let Some(handle) = shared.take_handle_if(id) {
						if let Err(err) = handle.session().close().await {
							tracing::warn!(
								connection_id = %id,
								error = %err,
								"failed to close abandoned connection"
							);
						}
					}
					break;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::MemoryBackend;
	use rstest::rstest;
	use std::time::Duration;

	fn settings() -> ConnectionSettings {
		ConnectionSettings::default()
			.with_url_env("HARNESS_MANAGER_UNIT_UNSET")
			.with_default_url("memory://unit")
			.with_bootstrap_interval(Duration::from_millis(100))
	}

	fn drain(rx: &mut broadcast::Receiver<ConnectionEvent>) -> Vec<ConnectionEvent> {
		let mut events = Vec::new();
		while let Ok(event) = rx.try_recv() {
			events.push(event);
		}
		events
	}

	#[rstest]
	#[tokio::test]
	async fn test_transition_emits_only_on_flip() {
		// Arrange
		let manager = ConnectionManager::new(Arc::new(MemoryBackend::new()), settings());
		let mut events = manager.subscribe();

		// Act
		manager.shared.transition(ConnectionState::Connecting);
		manager.shared.transition(ConnectionState::Connected);
		manager.shared.transition(ConnectionState::Connected);
		manager.shared.transition(ConnectionState::Disconnected);
		manager.shared.transition(ConnectionState::Disconnected);

		// Assert
		assert_eq!(
			drain(&mut events),
			vec![ConnectionEvent::Connected, ConnectionEvent::Disconnected]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_reconnect_replaces_handle() {
		// Arrange
		let backend = MemoryBackend::new();
		let manager = ConnectionManager::new(Arc::new(backend.clone()), settings());
		manager.connect(RetryPolicy::default()).await.unwrap();
		let first = manager.connection_handle().unwrap();
		let mut events = manager.subscribe();

		// Act
		manager.connect(RetryPolicy::default()).await.unwrap();

		// Assert
		let second = manager.connection_handle().unwrap();
		assert_ne!(first.id(), second.id());
		assert_eq!(backend.open_sessions(), 1);
		assert_eq!(
			drain(&mut events),
			vec![ConnectionEvent::Disconnected, ConnectionEvent::Connected]
		);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_dispose_cancels_bootstrap() {
		// Arrange
		let backend = MemoryBackend::new();
		backend.set_reachable(false);
		let manager = Arc::new(ConnectionManager::new(Arc::new(backend.clone()), settings()));
		let connecting = {
			let manager = Arc::clone(&manager);
			tokio::spawn(async move { manager.connect(RetryPolicy::default()).await })
		};
		tokio::time::sleep(Duration::from_millis(350)).await;

		// Act
		manager.dispose().await;
		let result = connecting.await.unwrap();

		// Assert
		assert_eq!(result, Err(ConnectionError::Cancelled));
		assert_eq!(manager.state(), ConnectionState::Disconnected);
		assert!(backend.open_attempts() >= 3);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_bootstrap_deadline_surfaces_timeout() {
		// Arrange
		let backend = MemoryBackend::new();
		backend.set_reachable(false);
		let manager = ConnectionManager::new(
			Arc::new(backend),
			settings().with_bootstrap_deadline(Some(Duration::from_millis(250))),
		);

		// Act
		let result = manager.connect(RetryPolicy::default()).await;

		// Assert
		match result {
			Err(ConnectionError::BootstrapTimedOut { attempts, .. }) => assert_eq!(attempts, 4),
			other => panic!("expected timeout, got {:?}", other),
		}
		assert!(manager.connection_handle().is_none());
	}
}
