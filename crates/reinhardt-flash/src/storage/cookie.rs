//! Cookie-based flash storage backend
//!
//! The pending messages are serialized to JSON, base64-encoded and written
//! to a cookie named after the configured session name. Undecodable cookie
//! data is treated as "no messages".

use super::FlashStorage;
use crate::config::StorageBackend;
use crate::error::{BackendResult, FlashResult};
use crate::store::MessageStore;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use http::header::{COOKIE, HeaderValue, InvalidHeaderValue, SET_COOKIE};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Request/response cookie access
pub trait CookieJar: Send + Sync {
	/// Queue a cookie on the response; an empty value removes it
	fn set_cookie(&self, name: &str, value: &str) -> BackendResult<()>;

	/// Cookie sent with the current request
	fn cookie(&self, name: &str) -> Option<String>;
}

/// Flash storage backed by a cookie
pub struct CookieFlashStorage {
	jar: Arc<dyn CookieJar>,
}

impl CookieFlashStorage {
	pub fn new(jar: Arc<dyn CookieJar>) -> Self {
		Self { jar }
	}

	/// Encode a store as a cookie value
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_flash::MessageStore;
	/// use reinhardt_flash::storage::CookieFlashStorage;
	///
	/// let mut store = MessageStore::new();
	/// store.push("error", "Bad input");
	///
	/// let encoded = CookieFlashStorage::encode(&store);
	/// assert_eq!(CookieFlashStorage::decode(&encoded), store);
	/// ```
	pub fn encode(store: &MessageStore) -> String {
		STANDARD.encode(store.to_value().to_string())
	}

	/// Decode a cookie value, yielding an empty store for bad data
	pub fn decode(raw: &str) -> MessageStore {
		let bytes = match STANDARD.decode(raw.trim()) {
			Ok(bytes) => bytes,
			Err(err) => {
				tracing::debug!("Discarding flash cookie with invalid base64: {}", err);
				return MessageStore::new();
			}
		};

		match serde_json::from_slice(&bytes) {
			Ok(value) => MessageStore::from_value_lossy(&value),
			Err(err) => {
				tracing::debug!("Discarding flash cookie with invalid JSON: {}", err);
				MessageStore::new()
			}
		}
	}
}

impl FlashStorage for CookieFlashStorage {
	fn backend(&self) -> StorageBackend {
		StorageBackend::Cookie
	}

	/// Clear the outgoing cookie so messages live for a single request
	fn initialize(&self, key: &str) -> FlashResult<()> {
		self.jar.set_cookie(key, "")?;
		Ok(())
	}

	fn load(&self, key: &str) -> FlashResult<MessageStore> {
		Ok(match self.jar.cookie(key) {
			Some(raw) if !raw.is_empty() => Self::decode(&raw),
			_ => MessageStore::new(),
		})
	}

	fn save(&self, key: &str, store: &MessageStore) -> FlashResult<()> {
		self.jar.set_cookie(key, &Self::encode(store))?;
		Ok(())
	}
}

/// In-process cookie jar simulating a browser
///
/// Cookies set during a request are sent back after
/// [`next_request`](Self::next_request).
///
/// # Examples
///
/// ```
/// use reinhardt_flash::storage::{CookieJar, MemoryCookieJar};
///
/// let jar = MemoryCookieJar::new().with_cookie("theme", "dark");
/// jar.set_cookie("flash", "e30=").unwrap();
/// assert_eq!(jar.cookie("flash"), None);
///
/// jar.next_request();
/// assert_eq!(jar.cookie("flash").as_deref(), Some("e30="));
/// assert_eq!(jar.cookie("theme").as_deref(), Some("dark"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
	incoming: Mutex<IndexMap<String, String>>,
	outgoing: Mutex<IndexMap<String, String>>,
}

impl MemoryCookieJar {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a cookie to the current request
	pub fn with_cookie(self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.incoming.lock().insert(name.into(), value.into());
		self
	}

	/// Value queued for the response, if any
	pub fn outgoing(&self, name: &str) -> Option<String> {
		self.outgoing.lock().get(name).cloned()
	}

	/// Deliver the response cookies and start the next request
	pub fn next_request(&self) {
		let outgoing = std::mem::take(&mut *self.outgoing.lock());
		let mut incoming = self.incoming.lock();
		for (name, value) in outgoing {
			if value.is_empty() {
				incoming.shift_remove(&name);
			} else {
				incoming.insert(name, value);
			}
		}
	}
}

impl CookieJar for MemoryCookieJar {
	fn set_cookie(&self, name: &str, value: &str) -> BackendResult<()> {
		self.outgoing.lock().insert(name.to_string(), value.to_string());
		Ok(())
	}

	fn cookie(&self, name: &str) -> Option<String> {
		self.incoming.lock().get(name).cloned()
	}
}

/// Cookie jar over HTTP headers
///
/// Reads the request `Cookie` header and writes queued cookies as
/// `Set-Cookie` headers on a response.
#[derive(Debug, Default)]
pub struct HeaderCookieJar {
	request: IndexMap<String, String>,
	response: Mutex<IndexMap<String, String>>,
}

impl HeaderCookieJar {
	/// Parse the cookies sent with a request
	///
	/// # Examples
	///
	/// ```
	/// use http::HeaderMap;
	/// use http::header::{COOKIE, HeaderValue};
	/// use reinhardt_flash::storage::{CookieJar, HeaderCookieJar};
	///
	/// let mut headers = HeaderMap::new();
	/// headers.insert(COOKIE, HeaderValue::from_static("sessionid=abc; flash=e30="));
	///
	/// let jar = HeaderCookieJar::from_request_headers(&headers);
	/// assert_eq!(jar.cookie("flash").as_deref(), Some("e30="));
	/// ```
	pub fn from_request_headers(headers: &HeaderMap) -> Self {
		let mut request = IndexMap::new();
		for header in headers.get_all(COOKIE) {
			let Ok(header) = header.to_str() else {
				continue;
			};
			for pair in header.split(';') {
				if let Some((name, value)) = pair.trim().split_once('=') {
					let value = value.trim().trim_matches('"');
					request.insert(name.trim().to_string(), value.to_string());
				}
			}
		}

		Self {
			request,
			response: Mutex::new(IndexMap::new()),
		}
	}

	/// Append one `Set-Cookie` header per queued cookie
	pub fn apply_to_response(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
		for (name, value) in self.response.lock().iter() {
			let header = if value.is_empty() {
				format!("{}=; Path=/; Max-Age=0", name)
			} else {
				format!("{}={}; Path=/", name, value)
			};
			headers.append(SET_COOKIE, HeaderValue::from_str(&header)?);
		}
		Ok(())
	}
}

impl CookieJar for HeaderCookieJar {
	fn set_cookie(&self, name: &str, value: &str) -> BackendResult<()> {
		self.response.lock().insert(name.to_string(), value.to_string());
		Ok(())
	}

	fn cookie(&self, name: &str) -> Option<String> {
		self.request.get(name).cloned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn sample_store() -> MessageStore {
		let mut store = MessageStore::new();
		store.push("success", "Profile saved");
		store.push("error", "Avatar too large");
		store.push("success", "Email confirmed");
		store
	}

	#[rstest]
	fn test_encoding_is_base64_json() {
		let encoded = CookieFlashStorage::encode(&sample_store());
		let json = STANDARD.decode(&encoded).unwrap();

		assert_eq!(
			String::from_utf8(json).unwrap(),
			r#"{"success":["Profile saved","Email confirmed"],"error":["Avatar too large"]}"#
		);
	}

	#[rstest]
	#[case("not base64 at all!")]
	#[case("e30")]
	#[case("bm90IGpzb24=")]
	#[case("WzEsMiwzXQ==")]
	fn test_corrupt_cookie_decodes_to_empty(#[case] raw: &str) {
		assert!(CookieFlashStorage::decode(raw).is_empty());
	}

	#[rstest]
	fn test_initialize_clears_outgoing_cookie() {
		let jar = Arc::new(MemoryCookieJar::new());
		let storage = CookieFlashStorage::new(jar.clone());

		storage.initialize("flash").unwrap();
		assert_eq!(jar.outgoing("flash").as_deref(), Some(""));
	}

	#[rstest]
	fn test_save_then_load_on_next_request() {
		let jar = Arc::new(MemoryCookieJar::new());
		let storage = CookieFlashStorage::new(jar.clone());

		storage.save("flash", &sample_store()).unwrap();
		assert!(storage.load("flash").unwrap().is_empty());

		jar.next_request();
		assert_eq!(storage.load("flash").unwrap(), sample_store());
	}

	#[rstest]
	fn test_empty_cookie_is_removed_on_next_request() {
		let jar = MemoryCookieJar::new().with_cookie("flash", "e30=");
		jar.set_cookie("flash", "").unwrap();
		jar.next_request();

		assert_eq!(jar.cookie("flash"), None);
	}

	#[rstest]
	fn test_header_jar_round_trip() {
		let jar = HeaderCookieJar::default();
		jar.set_cookie("flash", "eyJhIjpbImIiXX0=").unwrap();
		jar.set_cookie("stale", "").unwrap();

		let mut response = HeaderMap::new();
		jar.apply_to_response(&mut response).unwrap();

		let cookies: Vec<_> = response
			.get_all(SET_COOKIE)
			.iter()
			.map(|v| v.to_str().unwrap().to_string())
			.collect();
		assert_eq!(
			cookies,
			vec![
				"flash=eyJhIjpbImIiXX0=; Path=/".to_string(),
				"stale=; Path=/; Max-Age=0".to_string(),
			]
		);
	}

	#[rstest]
	fn test_header_jar_parses_multiple_headers() {
		let mut headers = HeaderMap::new();
		headers.append(COOKIE, HeaderValue::from_static("a=1; b=2"));
		headers.append(COOKIE, HeaderValue::from_static("flash=\"e30=\""));

		let jar = HeaderCookieJar::from_request_headers(&headers);
		assert_eq!(jar.cookie("a").as_deref(), Some("1"));
		assert_eq!(jar.cookie("b").as_deref(), Some("2"));
		assert_eq!(jar.cookie("flash").as_deref(), Some("e30="));
		assert_eq!(jar.cookie("missing"), None);
	}
}
