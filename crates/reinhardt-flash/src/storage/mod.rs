//! Persistence of deferred flash messages
//!
//! The messenger talks to a [`FlashStorage`]; the two implementations sit on
//! top of framework collaborators:
//!
//! - [`SessionFlashStorage`] over a [`FlashdataSession`]
//! - [`CookieFlashStorage`] over a [`CookieJar`]
//!
//! In-process collaborators ([`MemorySession`], [`MemoryCookieJar`],
//! [`HeaderCookieJar`]) are provided for embedding and testing.

pub mod cookie;
pub mod session;

use crate::config::StorageBackend;
use crate::error::FlashResult;
use crate::store::MessageStore;

pub use cookie::{CookieFlashStorage, CookieJar, HeaderCookieJar, MemoryCookieJar};
pub use session::{FlashdataSession, MemorySession, SessionFlashStorage};

/// Backend holding the pending messages between requests
pub trait FlashStorage: Send + Sync {
	/// Which backend this is
	fn backend(&self) -> StorageBackend;

	/// Prepare the storage slot named `key` when the messenger is created
	fn initialize(&self, key: &str) -> FlashResult<()>;

	/// Messages persisted by the previous request
	///
	/// Missing or undecodable data yields an empty store.
	fn load(&self, key: &str) -> FlashResult<MessageStore>;

	/// Overwrite the stored mapping with `store`
	fn save(&self, key: &str, store: &MessageStore) -> FlashResult<()>;
}
