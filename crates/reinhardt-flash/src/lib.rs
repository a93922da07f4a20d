//! Flash messages for Reinhardt
//!
//! Short-lived notices, errors and form feedback that survive exactly one
//! redirect, rendered as HTML fragments.
//!
//! ## Features
//!
//! - **Two storage backends**: session flashdata or a base64-encoded JSON cookie
//! - **Typed buckets**: messages grouped under caller-chosen types (`error`, `success`, ...)
//! - **Immediate messages**: shown on the current request without being persisted
//! - **Formatting**: printf-style positional substitution of message data
//! - **Form errors**: validation errors folded into the `error` type or kept under `form`
//! - **Styles**: per-type HTML wrappers, grouped in a list or split per message
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use reinhardt_flash::prelude::*;
//!
//! let jar = Arc::new(MemoryCookieJar::new());
//! let overrides = FlashConfigOverrides::default()
//!     .with_storage(StorageBackend::Cookie)
//!     .with_style("success", ("<div class=\"alert-success\">", "</div>"));
//!
//! let mut flash = FlashMessenger::new(FlashContext::new().with_cookies(jar.clone()), overrides.clone())?;
//! flash.success("Profile updated")?;
//!
//! jar.next_request();
//! let flash = FlashMessenger::new(FlashContext::new().with_cookies(jar), overrides)?;
//! assert_eq!(
//!     flash.display("success", Some(true))?,
//!     "<div class=\"alert-success\">Profile updated</div>"
//! );
//! # Ok::<(), reinhardt_flash::FlashError>(())
//! ```
//!
//! ## Note
//!
//! Message text is written into the HTML verbatim. Never flash unescaped
//! user input.

pub mod config;
pub mod error;
pub mod format;
pub mod messenger;
pub mod render;
pub mod storage;
pub mod store;
pub mod validation;

pub use config::{
	ConfigError, ConfigSource, FlashConfig, FlashConfigOverrides, StaticConfigSource,
	StorageBackend, Style,
};
pub use error::{BackendError, BackendResult, FlashError, FlashResult};
pub use format::{FormatArgs, FormatError, MessageValue, format_message};
pub use messenger::{DEFAULT_TYPE, ERROR_TYPE, FORM_TYPE, FlashContext, FlashMessenger};
pub use render::render_messages;
pub use storage::{
	CookieFlashStorage, CookieJar, FlashStorage, FlashdataSession, HeaderCookieJar,
	MemoryCookieJar, MemorySession, SessionFlashStorage,
};
pub use store::MessageStore;
pub use validation::{FormErrors, ValidationErrorSource};

/// Re-export commonly used types
pub mod prelude {
	pub use crate::config::{FlashConfig, FlashConfigOverrides, StorageBackend, Style};
	pub use crate::error::{FlashError, FlashResult};
	pub use crate::messenger::{FlashContext, FlashMessenger};
	pub use crate::storage::{
		CookieJar, FlashdataSession, HeaderCookieJar, MemoryCookieJar, MemorySession,
	};
	pub use crate::store::MessageStore;
	pub use crate::validation::{FormErrors, ValidationErrorSource};
}
