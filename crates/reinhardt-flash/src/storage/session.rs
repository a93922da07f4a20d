//! Session flashdata storage backend

use super::FlashStorage;
use crate::config::StorageBackend;
use crate::error::{BackendResult, FlashResult};
use crate::store::MessageStore;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Session service offering one-request flashdata
///
/// Data written with [`set_flashdata`](Self::set_flashdata) must be readable
/// through [`flashdata`](Self::flashdata) on the following request only.
pub trait FlashdataSession: Send + Sync {
	/// Make sure the session is running before it is used
	fn ensure_started(&self) -> BackendResult<()> {
		Ok(())
	}

	fn set_flashdata(&self, key: &str, value: Value) -> BackendResult<()>;

	fn flashdata(&self, key: &str) -> BackendResult<Option<Value>>;
}

/// Flash storage backed by session flashdata
pub struct SessionFlashStorage {
	session: Arc<dyn FlashdataSession>,
}

impl SessionFlashStorage {
	pub fn new(session: Arc<dyn FlashdataSession>) -> Self {
		Self { session }
	}
}

impl FlashStorage for SessionFlashStorage {
	fn backend(&self) -> StorageBackend {
		StorageBackend::Session
	}

	fn initialize(&self, _key: &str) -> FlashResult<()> {
		self.session.ensure_started()?;
		Ok(())
	}

	fn load(&self, key: &str) -> FlashResult<MessageStore> {
		let store = match self.session.flashdata(key)? {
			Some(value) => MessageStore::from_value_lossy(&value),
			None => MessageStore::new(),
		};
		tracing::trace!(key, messages = store.len(), "Loaded flashdata");
		Ok(store)
	}

	fn save(&self, key: &str, store: &MessageStore) -> FlashResult<()> {
		self.session.set_flashdata(key, store.to_value())?;
		Ok(())
	}
}

/// In-process session with flashdata aging
///
/// Values set during one request become visible after
/// [`next_request`](Self::next_request) and disappear after the one after.
///
/// # Examples
///
/// ```
/// use reinhardt_flash::storage::{FlashdataSession, MemorySession};
/// use serde_json::json;
///
/// let session = MemorySession::new();
/// session.set_flashdata("flash", json!({"error": ["Bad input"]})).unwrap();
/// assert_eq!(session.flashdata("flash").unwrap(), None);
///
/// session.next_request();
/// assert!(session.flashdata("flash").unwrap().is_some());
///
/// session.next_request();
/// assert_eq!(session.flashdata("flash").unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct MemorySession {
	current: Mutex<IndexMap<String, Value>>,
	next: Mutex<IndexMap<String, Value>>,
}

impl MemorySession {
	pub fn new() -> Self {
		Self::default()
	}

	/// Move to the next request: fresh flashdata becomes readable, the
	/// previously readable flashdata expires
	pub fn next_request(&self) {
		let next = std::mem::take(&mut *self.next.lock());
		*self.current.lock() = next;
	}

	/// Flashdata written during the current request
	pub fn pending(&self, key: &str) -> Option<Value> {
		self.next.lock().get(key).cloned()
	}
}

impl FlashdataSession for MemorySession {
	fn set_flashdata(&self, key: &str, value: Value) -> BackendResult<()> {
		self.next.lock().insert(key.to_string(), value);
		Ok(())
	}

	fn flashdata(&self, key: &str) -> BackendResult<Option<Value>> {
		Ok(self.current.lock().get(key).cloned())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_memory_session_aging() {
		let session = MemorySession::new();
		session.set_flashdata("flash", json!({"info": ["a"]})).unwrap();

		assert_eq!(session.pending("flash"), Some(json!({"info": ["a"]})));
		assert_eq!(session.flashdata("flash").unwrap(), None);

		session.next_request();
		assert_eq!(session.flashdata("flash").unwrap(), Some(json!({"info": ["a"]})));
		assert_eq!(session.pending("flash"), None);

		session.next_request();
		assert_eq!(session.flashdata("flash").unwrap(), None);
	}

	#[rstest]
	fn test_session_storage_save_overwrites() {
		let session = Arc::new(MemorySession::new());
		let storage = SessionFlashStorage::new(session.clone());

		let mut store = MessageStore::new();
		store.push("error", "first");
		storage.save("flash", &store).unwrap();

		store.push("error", "second");
		storage.save("flash", &store).unwrap();

		assert_eq!(
			session.pending("flash"),
			Some(json!({"error": ["first", "second"]}))
		);
	}

	#[rstest]
	fn test_session_storage_load() {
		let session = Arc::new(MemorySession::new());
		let storage = SessionFlashStorage::new(session.clone());

		let mut store = MessageStore::new();
		store.push("success", "Saved");
		storage.save("flash", &store).unwrap();

		assert!(storage.load("flash").unwrap().is_empty());
		session.next_request();
		assert_eq!(storage.load("flash").unwrap(), store);
	}

	#[rstest]
	fn test_session_storage_ignores_corrupt_flashdata() {
		let session = Arc::new(MemorySession::new());
		session.set_flashdata("flash", json!("garbage")).unwrap();
		session.next_request();

		let storage = SessionFlashStorage::new(session);
		assert!(storage.load("flash").unwrap().is_empty());
	}
}
