//! In-process document store
//!
//! Keeps collections in insertion order and evaluates a small filter subset:
//! the empty filter, field equality, and the `$eq`, `$ne`, `$in` operators.
//! Anything else is rejected as an invalid filter before any document is touched.
//!
//! The store also carries fault injection (unreachable store, refused opens,
//! failing deletes, transport drops) so lifecycle and reset behaviour can be
//! exercised without a server.

use async_trait::async_trait;
use bson::{Bson, Document};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::connection::RetryPolicy;
use crate::driver::{DocumentStoreDriver, StoreSession, TransportMonitor, TransportSignal};
use crate::error::{Result, StoreError};

/// Cloneable handle on an in-process document store
///
/// Clones share the same data, so a test can keep one clone for seeding and
/// inspection while the manager owns another as its driver.
///
/// # Examples
///
/// ```
/// use bson::doc;
/// use harness_db::backends::MemoryBackend;
///
/// let backend = MemoryBackend::new();
/// backend.insert("institutions", doc! { "name": "North Campus" });
/// assert_eq!(backend.count("institutions"), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryBackend {
	store: Arc<MemoryStore>,
}

struct MemoryStore {
	collections: RwLock<IndexMap<String, Vec<Document>>>,
	reachable: AtomicBool,
	refused_opens: AtomicU32,
	failing_deletes: Mutex<HashMap<String, String>>,
	monitors: Mutex<Vec<TransportMonitor>>,
	open_attempts: AtomicU32,
	open_sessions: AtomicUsize,
	last_policy: Mutex<Option<RetryPolicy>>,
	last_url: Mutex<Option<String>>,
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self {
			collections: RwLock::new(IndexMap::new()),
			reachable: AtomicBool::new(true),
			refused_opens: AtomicU32::new(0),
			failing_deletes: Mutex::new(HashMap::new()),
			monitors: Mutex::new(Vec::new()),
			open_attempts: AtomicU32::new(0),
			open_sessions: AtomicUsize::new(0),
			last_policy: Mutex::new(None),
			last_url: Mutex::new(None),
		}
	}
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// Create `collection` if it does not exist yet
	pub fn create_collection(&self, collection: &str) {
		self.store
			.collections
			.write()
			.entry(collection.to_string())
			.or_default();
	}

	/// Insert a document, creating the collection on first write
	pub fn insert(&self, collection: &str, document: Document) {
		self.insert_many(collection, [document]);
	}

	pub fn insert_many(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
		self.store
			.collections
			.write()
			.entry(collection.to_string())
			.or_default()
			.extend(documents);
	}

	/// Snapshot of the documents in `collection`
	pub fn documents(&self, collection: &str) -> Vec<Document> {
		self.store
			.collections
			.read()
			.get(collection)
			.cloned()
			.unwrap_or_default()
	}

	pub fn count(&self, collection: &str) -> usize {
		self.store
			.collections
			.read()
			.get(collection)
			.map_or(0, Vec::len)
	}

	pub fn has_collection(&self, collection: &str) -> bool {
		self.store.collections.read().contains_key(collection)
	}

	/// Collection names in creation order
	pub fn collection_names(&self) -> Vec<String> {
		self.store.collections.read().keys().cloned().collect()
	}

	/// Make every open and every session operation fail with a connection error
	pub fn set_reachable(&self, reachable: bool) {
		self.store.reachable.store(reachable, Ordering::SeqCst);
	}

	/// Refuse the next `count` open attempts even while reachable
	pub fn refuse_next_opens(&self, count: u32) {
		self.store.refused_opens.store(count, Ordering::SeqCst);
	}

	/// Make deletes on `collection` fail with `message`
	pub fn fail_deletes(&self, collection: &str, message: impl Into<String>) {
		self.store
			.failing_deletes
			.lock()
			.insert(collection.to_string(), message.into());
	}

	pub fn clear_failures(&self) {
		self.store.failing_deletes.lock().clear();
	}

	/// Simulate a transport drop on every live session
	pub fn drop_transport(&self) {
		self.set_reachable(false);
		self.broadcast(TransportSignal::Down);
	}

	/// Simulate one failed driver reconnection attempt
	pub fn fail_heartbeat(&self) {
		self.broadcast(TransportSignal::Down);
	}

	/// Simulate the driver recovering the transport
	pub fn restore_transport(&self) {
		self.set_reachable(true);
		self.broadcast(TransportSignal::Up);
	}

	/// Number of `open` calls seen, successful or not
	pub fn open_attempts(&self) -> u32 {
		self.store.open_attempts.load(Ordering::SeqCst)
	}

	/// Number of sessions opened and not yet closed
	pub fn open_sessions(&self) -> usize {
		self.store.open_sessions.load(Ordering::SeqCst)
	}

	/// Policy passed to the most recent successful open
	pub fn last_policy(&self) -> Option<RetryPolicy> {
		*self.store.last_policy.lock()
	}

	/// URL passed to the most recent `open` call, successful or not
	pub fn last_url(&self) -> Option<String> {
		self.store.last_url.lock().clone()
	}

	fn broadcast(&self, signal: TransportSignal) {
		let mut monitors = self.store.monitors.lock();
		monitors.retain(|monitor| !monitor.is_closed());
		for monitor in monitors.iter() {
			monitor.report(signal);
		}
	}
}

impl MemoryStore {
	fn ensure_reachable(&self) -> Result<()> {
		if self.reachable.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(StoreError::Connection("connection refused".to_string()))
		}
	}
}

#[async_trait]
impl DocumentStoreDriver for MemoryBackend {
	async fn open(
		&self,
		url: &str,
		policy: &RetryPolicy,
		monitor: TransportMonitor,
	) -> Result<Arc<dyn StoreSession>> {
		self.store.open_attempts.fetch_add(1, Ordering::SeqCst);
		*self.store.last_url.lock() = Some(url.to_string());
		self.store.ensure_reachable()?;

		let refused = self
			.store
			.refused_opens
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
		if refused.is_ok() {
			return Err(StoreError::Connection(
				"server selection timed out".to_string(),
			));
		}

		*self.store.last_policy.lock() = Some(*policy);
		self.store.monitors.lock().push(monitor);
		self.store.open_sessions.fetch_add(1, Ordering::SeqCst);

		Ok(Arc::new(MemorySession {
			store: Arc::clone(&self.store),
			closed: AtomicBool::new(false),
		}))
	}
}

struct MemorySession {
	store: Arc<MemoryStore>,
	closed: AtomicBool,
}

impl MemorySession {
	fn ensure_usable(&self) -> Result<()> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(StoreError::Closed);
		}
		self.store.ensure_reachable()
	}
}

#[async_trait]
impl StoreSession for MemorySession {
	async fn existing_collections(&self, candidates: &[&str]) -> Result<Vec<String>> {
		self.ensure_usable()?;

		Ok(self
			.store
			.collections
			.read()
			.keys()
			.filter(|name| candidates.contains(&name.as_str()))
			.cloned()
			.collect())
	}

	async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64> {
		self.ensure_usable()?;
		validate_filter(&filter)?;

		if let Some(message) = self.store.failing_deletes.lock().get(collection) {
			return Err(StoreError::Execution(message.clone()));
		}

		let mut collections = self.store.collections.write();
		let Some(documents) = collections.get_mut(collection) else {
			return Ok(0);
		};

		let before = documents.len();
		documents.retain(|document| !matches(document, &filter));
		Ok((before - documents.len()) as u64)
	}

	async fn close(&self) -> Result<()> {
		if !self.closed.swap(true, Ordering::SeqCst) {
			self.store.open_sessions.fetch_sub(1, Ordering::SeqCst);
		}
		Ok(())
	}
}

fn validate_filter(filter: &Document) -> Result<()> {
	for (key, condition) in filter {
		if key.starts_with('$') {
			return Err(StoreError::InvalidFilter(format!(
				"unsupported top-level operator {}",
				key
			)));
		}
		if let Some(operators) = operator_document(condition) {
			for (op, operand) in operators {
				match op.as_str() {
					"$eq" | "$ne" => {}
					"$in" if matches!(operand, Bson::Array(_)) => {}
					"$in" => {
						return Err(StoreError::InvalidFilter(format!(
							"$in on {} needs an array",
							key
						)));
					}
					other => {
						return Err(StoreError::InvalidFilter(format!(
							"unsupported operator {} on {}",
							other, key
						)));
					}
				}
			}
		}
	}
	Ok(())
}

/// The condition as an operator document, when it is one
fn operator_document(condition: &Bson) -> Option<&Document> {
	match condition {
		Bson::Document(inner) if inner.keys().next().is_some_and(|k| k.starts_with('$')) => {
			Some(inner)
		}
		_ => None,
	}
}

/// Evaluate a filter that already passed [`validate_filter`]
fn matches(document: &Document, filter: &Document) -> bool {
	filter.iter().all(|(key, condition)| {
		let value = document.get(key);
		match operator_document(condition) {
			Some(operators) => operators.iter().all(|(op, operand)| match op.as_str() {
				"$eq" => value == Some(operand),
				"$ne" => value != Some(operand),
				"$in" => match operand {
					Bson::Array(options) => value.is_some_and(|v| options.contains(v)),
					_ => false,
				},
				_ => false,
			}),
			None => value == Some(condition),
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;
	use rstest::rstest;

	async fn open(backend: &MemoryBackend) -> Arc<dyn StoreSession> {
		let (monitor, _rx) = TransportMonitor::channel();
		backend
			.open("memory://", &RetryPolicy::default(), monitor)
			.await
			.unwrap()
	}

	#[rstest]
	#[case(doc! {}, 4)]
	#[case(doc! { "type": "admin" }, 1)]
	#[case(doc! { "type": { "$ne": "admin" } }, 3)]
	#[case(doc! { "type": { "$in": ["child", "family"] } }, 2)]
	#[case(doc! { "type": { "$eq": "educator" } }, 0)]
	#[tokio::test]
	async fn test_delete_many_filters(#[case] filter: Document, #[case] expected: u64) {
		// Arrange
		let backend = MemoryBackend::new();
		backend.insert_many(
			"users",
			[
				doc! { "email": "admin@example.com", "type": "admin" },
				doc! { "email": "kid@example.com", "type": "child" },
				doc! { "email": "fam@example.com", "type": "family" },
				doc! { "email": "legacy@example.com" },
			],
		);
		let session = open(&backend).await;

		// Act
		let deleted = session.delete_many("users", filter).await.unwrap();

		// Assert
		assert_eq!(deleted, expected);
		assert_eq!(backend.count("users"), 4 - expected as usize);
	}

	#[rstest]
	#[case(doc! { "age": { "$gt": 1 } })]
	#[case(doc! { "age": { "$in": 3 } })]
	#[case(doc! { "$or": [{ "age": 3 }] })]
	#[tokio::test]
	async fn test_invalid_filter_touches_nothing(#[case] filter: Document) {
		// Arrange
		let backend = MemoryBackend::new();
		backend.insert("users", doc! { "age": 3 });
		let session = open(&backend).await;

		// Act
		let result = session.delete_many("users", filter).await;

		// Assert
		assert!(matches!(result, Err(StoreError::InvalidFilter(_))));
		assert_eq!(backend.count("users"), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_existing_collections_keeps_store_order() {
		// Arrange
		let backend = MemoryBackend::new();
		backend.create_collection("integrationevents");
		backend.create_collection("sessions");
		backend.insert("institutions", doc! { "name": "a" });
		let session = open(&backend).await;

		// Act
		let existing = session
			.existing_collections(&["institutions", "users", "integrationevents"])
			.await
			.unwrap();

		// Assert
		assert_eq!(existing, vec!["integrationevents", "institutions"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_refused_opens_then_success() {
		// Arrange
		let backend = MemoryBackend::new();
		backend.refuse_next_opens(2);
		let (monitor, _rx) = TransportMonitor::channel();
		let policy = RetryPolicy::default();

		// Act
		let first = backend.open("memory://", &policy, monitor.clone()).await;
		let second = backend.open("memory://", &policy, monitor.clone()).await;
		let third = backend.open("memory://", &policy, monitor).await;

		// Assert
		assert!(first.is_err());
		assert!(second.is_err());
		assert!(third.is_ok());
		assert_eq!(backend.open_attempts(), 3);
		assert_eq!(backend.open_sessions(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_closed_session_rejects_operations() {
		// Arrange
		let backend = MemoryBackend::new();
		let session = open(&backend).await;

		// Act
		session.close().await.unwrap();
		session.close().await.unwrap();
		let result = session.delete_many("users", doc! {}).await;

		// Assert
		assert_eq!(result, Err(StoreError::Closed));
		assert_eq!(backend.open_sessions(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_transport_signals_reach_monitors() {
		// Arrange
		let backend = MemoryBackend::new();
		let (monitor, mut rx) = TransportMonitor::channel();
		let _session = backend
			.open("memory://", &RetryPolicy::default(), monitor)
			.await
			.unwrap();

		// Act
		backend.drop_transport();
		backend.restore_transport();

		// Assert
		assert_eq!(rx.recv().await, Some(TransportSignal::Down));
		assert_eq!(rx.recv().await, Some(TransportSignal::Up));
	}
}
