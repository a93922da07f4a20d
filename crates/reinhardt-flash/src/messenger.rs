//! The flash messenger
//!
//! A [`FlashMessenger`] lives for one request. Messages added without
//! `display_now` are persisted for the next request; messages added with it
//! are only shown by [`display`](FlashMessenger::display) calls during the
//! current request.
//!
//! ```
//! use std::sync::Arc;
//! use reinhardt_flash::prelude::*;
//!
//! let session = Arc::new(MemorySession::new());
//! let overrides = FlashConfigOverrides::default().with_style("error", ("<p class=e>", "</p>"));
//!
//! // First request: flash an error and redirect
//! let mut flash = FlashMessenger::new(
//!     FlashContext::new().with_session(session.clone()),
//!     overrides.clone(),
//! )
//! .unwrap();
//! flash.error("Bad input").unwrap();
//!
//! // Next request: render it
//! session.next_request();
//! let flash = FlashMessenger::new(FlashContext::new().with_session(session), overrides).unwrap();
//! assert_eq!(flash.display_all().unwrap(), "<p class=e><ul><li>Bad input</li></ul></p>");
//! ```

use crate::config::{ConfigError, ConfigSource, FlashConfig, FlashConfigOverrides, StorageBackend};
use crate::error::{FlashError, FlashResult};
use crate::format::{FormatArgs, MessageValue, format_message};
use crate::render::render_messages;
use crate::storage::{
	CookieFlashStorage, CookieJar, FlashStorage, FlashdataSession, SessionFlashStorage,
};
use crate::store::MessageStore;
use crate::validation::{ValidationErrorSource, collect_errors};
use serde_json::Value;
use std::sync::Arc;

/// Type used when the caller does not name one
pub const DEFAULT_TYPE: &str = "default";

/// Type that form errors merge into when `merge_form_errors` is set
pub const ERROR_TYPE: &str = "error";

/// Type holding form errors that are not merged
pub const FORM_TYPE: &str = "form";

/// Suffix of the `<type>_now` call convention
const NOW_SUFFIX: &str = "_now";

/// Request-scoped services a messenger works against
///
/// Only the collaborator required by the configured storage backend must be
/// present.
#[derive(Clone, Default)]
pub struct FlashContext {
	session: Option<Arc<dyn FlashdataSession>>,
	cookies: Option<Arc<dyn CookieJar>>,
	validation: Option<Arc<dyn ValidationErrorSource>>,
	settings: Option<Arc<dyn ConfigSource>>,
}

impl FlashContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_session(mut self, session: Arc<dyn FlashdataSession>) -> Self {
		self.session = Some(session);
		self
	}

	pub fn with_cookies(mut self, cookies: Arc<dyn CookieJar>) -> Self {
		self.cookies = Some(cookies);
		self
	}

	/// Source of form validation errors for this request
	pub fn with_validation(mut self, validation: Arc<dyn ValidationErrorSource>) -> Self {
		self.validation = Some(validation);
		self
	}

	/// Global settings; the `flash` entry is merged beneath explicit overrides
	pub fn with_settings(mut self, settings: Arc<dyn ConfigSource>) -> Self {
		self.settings = Some(settings);
		self
	}
}

/// Collects flash messages by type and renders them as HTML
pub struct FlashMessenger {
	config: FlashConfig,
	storage: Box<dyn FlashStorage>,
	validation: Option<Arc<dyn ValidationErrorSource>>,
	pending: MessageStore,
	immediate: MessageStore,
}

impl FlashMessenger {
	/// Create a messenger for the current request
	///
	/// The configuration is resolved from the context's settings and
	/// `overrides`. With cookie storage the flash cookie is cleared on the
	/// response; with session storage the session is started.
	pub fn new(context: FlashContext, overrides: FlashConfigOverrides) -> FlashResult<Self> {
		let FlashContext {
			session,
			cookies,
			validation,
			settings,
		} = context;

		let config = FlashConfig::resolve(settings.as_deref(), overrides)?;

		let storage: Box<dyn FlashStorage> = match config.storage_type {
			StorageBackend::Session => {
				let session = session.ok_or(ConfigError::MissingCollaborator(
					"session",
					"session handle",
				))?;
				Box::new(SessionFlashStorage::new(session))
			}
			StorageBackend::Cookie => {
				let jar = cookies.ok_or(ConfigError::MissingCollaborator("cookie", "cookie jar"))?;
				Box::new(CookieFlashStorage::new(jar))
			}
		};
		storage.initialize(&config.session_name)?;

		tracing::debug!(
			backend = config.storage_type.as_str(),
			session_name = %config.session_name,
			"Flash messenger initialized"
		);

		Ok(Self {
			config,
			storage,
			validation,
			pending: MessageStore::new(),
			immediate: MessageStore::new(),
		})
	}

	/// Add a message of `message_type`
	///
	/// `message` is used as a format template when `data` is non-empty.
	/// Deferred messages (`display_now == false`) are appended to the pending
	/// store, which is then written to storage in full.
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use reinhardt_flash::prelude::*;
	///
	/// let session = Arc::new(MemorySession::new());
	/// let mut flash = FlashMessenger::new(
	///     FlashContext::new().with_session(session.clone()),
	///     FlashConfigOverrides::default(),
	/// )
	/// .unwrap();
	///
	/// flash
	///     .add_message("Deleted %d of %d files", vec![2, 3], "success", false)
	///     .unwrap()
	///     .add_message("Reloading", (), "info", true)
	///     .unwrap();
	///
	/// assert_eq!(flash.pending().get("success").unwrap(), ["Deleted 2 of 3 files"]);
	/// assert_eq!(flash.immediate().get("info").unwrap(), ["Reloading"]);
	/// ```
	pub fn add_message(
		&mut self,
		message: impl Into<MessageValue>,
		data: impl Into<FormatArgs>,
		message_type: &str,
		display_now: bool,
	) -> FlashResult<&mut Self> {
		let template = message.into().to_string();
		let text = format_message(&template, &data.into())?;

		if display_now {
			tracing::trace!(message_type, "Adding flash message for this request");
			self.immediate.push(message_type, text);
		} else {
			tracing::trace!(message_type, "Adding flash message for the next request");
			// The pending store only changes once storage has accepted it
			let mut pending = self.pending.clone();
			pending.push(message_type, text);
			self.storage.save(&self.config.session_name, &pending)?;
			self.pending = pending;
		}

		Ok(self)
	}

	/// Add a message from loosely typed values
	///
	/// Fails with [`FlashError::InvalidMessage`] when `message` is not a
	/// scalar or `message_type` is not a string.
	pub fn add_json(
		&mut self,
		message: &Value,
		data: &Value,
		message_type: &Value,
		display_now: bool,
	) -> FlashResult<&mut Self> {
		let Value::String(message_type) = message_type else {
			return Err(FlashError::InvalidMessage(format!(
				"message type must be a string, got {}",
				message_type
			)));
		};
		let message = MessageValue::try_from(message)?;
		let data = FormatArgs::from_json(data)?;

		self.add_message(message, data, message_type, display_now)
	}

	/// Handle a `<type>(message, data?)` or `<type>_now(message, data?)` call
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use reinhardt_flash::prelude::*;
	/// use serde_json::json;
	///
	/// let session = Arc::new(MemorySession::new());
	/// let mut flash = FlashMessenger::new(
	///     FlashContext::new().with_session(session),
	///     FlashConfigOverrides::default(),
	/// )
	/// .unwrap();
	///
	/// flash.dispatch("warning_now", &[json!("Disk %d%% full"), json!(91)]).unwrap();
	/// assert_eq!(flash.immediate().get("warning").unwrap(), ["Disk 91% full"]);
	///
	/// assert!(matches!(flash.dispatch("error", &[]), Err(FlashError::MissingArgument(_))));
	/// ```
	pub fn dispatch(&mut self, name: &str, args: &[Value]) -> FlashResult<&mut Self> {
		let Some(message) = args.first() else {
			return Err(FlashError::MissingArgument(name.to_string()));
		};
		let (message_type, display_now) = match name.strip_suffix(NOW_SUFFIX) {
			Some(message_type) => (message_type, true),
			None => (name, false),
		};
		let no_data = Value::Null;
		let data = args.get(1).unwrap_or(&no_data);

		self.add_json(
			message,
			data,
			&Value::String(message_type.to_string()),
			display_now,
		)
	}

	/// Flash `message` for the next request
	pub fn add(
		&mut self,
		message_type: &str,
		message: impl Into<MessageValue>,
	) -> FlashResult<&mut Self> {
		self.add_message(message, FormatArgs::None, message_type, false)
	}

	/// Flash `message` under the `default` type
	pub fn add_default(&mut self, message: impl Into<MessageValue>) -> FlashResult<&mut Self> {
		self.add(DEFAULT_TYPE, message)
	}

	/// Show `message` on the current request only
	pub fn add_now(
		&mut self,
		message_type: &str,
		message: impl Into<MessageValue>,
	) -> FlashResult<&mut Self> {
		self.add_message(message, FormatArgs::None, message_type, true)
	}

	/// Flash a formatted message for the next request
	pub fn add_with(
		&mut self,
		message_type: &str,
		message: impl Into<MessageValue>,
		data: impl Into<FormatArgs>,
	) -> FlashResult<&mut Self> {
		self.add_message(message, data, message_type, false)
	}

	pub fn error(&mut self, message: impl Into<MessageValue>) -> FlashResult<&mut Self> {
		self.add(ERROR_TYPE, message)
	}

	pub fn error_now(&mut self, message: impl Into<MessageValue>) -> FlashResult<&mut Self> {
		self.add_now(ERROR_TYPE, message)
	}

	pub fn success(&mut self, message: impl Into<MessageValue>) -> FlashResult<&mut Self> {
		self.add("success", message)
	}

	pub fn success_now(&mut self, message: impl Into<MessageValue>) -> FlashResult<&mut Self> {
		self.add_now("success", message)
	}

	pub fn info(&mut self, message: impl Into<MessageValue>) -> FlashResult<&mut Self> {
		self.add("info", message)
	}

	pub fn info_now(&mut self, message: impl Into<MessageValue>) -> FlashResult<&mut Self> {
		self.add_now("info", message)
	}

	pub fn warning(&mut self, message: impl Into<MessageValue>) -> FlashResult<&mut Self> {
		self.add("warning", message)
	}

	pub fn warning_now(&mut self, message: impl Into<MessageValue>) -> FlashResult<&mut Self> {
		self.add_now("warning", message)
	}

	/// Render messages as HTML
	///
	/// An empty `message_type` renders every type. `split` falls back to
	/// `split_default`. Persisted messages come before messages added for
	/// this request, and form validation errors are included for the empty,
	/// `form` and (when merging) `error` types. Nothing is cleared.
	pub fn display(&self, message_type: &str, split: Option<bool>) -> FlashResult<String> {
		let persisted = self.storage.load(&self.config.session_name)?;
		let mut current = self.immediate.clone();

		let all_types = message_type.is_empty();
		let merge = self.config.merge_form_errors;

		if all_types || message_type == FORM_TYPE || (merge && message_type == ERROR_TYPE) {
			for error in collect_errors(self.validation.as_deref()) {
				if merge && (all_types || message_type == ERROR_TYPE) {
					current.push(ERROR_TYPE, error);
				} else {
					current.push(FORM_TYPE, error);
				}
			}
		}

		let (persisted, current) = if all_types {
			(persisted, current)
		} else {
			(
				persisted.restrict_to(message_type),
				current.restrict_to(message_type),
			)
		};

		let messages = current.merge_under(persisted);
		let split = split.unwrap_or(self.config.split_default);

		tracing::debug!(
			message_type,
			split,
			messages = messages.len(),
			"Rendering flash messages"
		);

		Ok(render_messages(&messages, &self.config, split))
	}

	/// Render every type with the default split mode
	pub fn display_all(&self) -> FlashResult<String> {
		self.display("", None)
	}

	pub fn config(&self) -> &FlashConfig {
		&self.config
	}

	/// Adjust configuration on a live messenger
	///
	/// The storage backend is fixed at construction; changing
	/// `storage_type` here has no effect.
	pub fn config_mut(&mut self) -> &mut FlashConfig {
		&mut self.config
	}

	pub fn backend(&self) -> StorageBackend {
		self.storage.backend()
	}

	/// Messages queued for the next request
	pub fn pending(&self) -> &MessageStore {
		&self.pending
	}

	/// Messages shown on this request only
	pub fn immediate(&self) -> &MessageStore {
		&self.immediate
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::{MemoryCookieJar, MemorySession};
	use crate::validation::FormErrors;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn session() -> Arc<MemorySession> {
		Arc::new(MemorySession::new())
	}

	fn messenger(session: &Arc<MemorySession>, overrides: FlashConfigOverrides) -> FlashMessenger {
		FlashMessenger::new(FlashContext::new().with_session(session.clone()), overrides).unwrap()
	}

	#[rstest]
	fn test_display_now_renders_immediately(session: Arc<MemorySession>) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		flash.add_message("Hello", (), "notice", true).unwrap();

		assert_eq!(
			flash.display("notice", Some(false)).unwrap(),
			"<div><ul><li>Hello</li></ul></div>"
		);
		assert_eq!(session.pending("flash"), None);
	}

	#[rstest]
	#[case(MessageValue::from(42), "42")]
	#[case(MessageValue::from(1.5), "1.5")]
	#[case(MessageValue::from(true), "1")]
	fn test_scalar_messages(session: Arc<MemorySession>, #[case] message: MessageValue, #[case] text: &str) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		flash.add_now("count", message).unwrap();

		assert_eq!(
			flash.display("count", Some(true)).unwrap(),
			format!("<div>{}</div>", text)
		);
	}

	#[rstest]
	fn test_deferred_message_is_persisted_in_full(session: Arc<MemorySession>) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		flash.error("one").unwrap().success("two").unwrap().error("three").unwrap();

		assert_eq!(
			session.pending("flash"),
			Some(json!({"error": ["one", "three"], "success": ["two"]}))
		);
	}

	#[rstest]
	fn test_custom_session_name(session: Arc<MemorySession>) {
		let mut flash = messenger(
			&session,
			FlashConfigOverrides::default().with_session_name("notices"),
		);
		flash.info("hi").unwrap();

		assert_eq!(session.pending("notices"), Some(json!({"info": ["hi"]})));
		assert_eq!(session.pending("flash"), None);
	}

	#[rstest]
	fn test_chained_wrappers(session: Arc<MemorySession>) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		flash
			.warning_now("w")
			.unwrap()
			.info_now("i")
			.unwrap()
			.success_now("s")
			.unwrap()
			.error_now("e")
			.unwrap();

		assert_eq!(
			flash.immediate().types().collect::<Vec<_>>(),
			vec!["warning", "info", "success", "error"]
		);
	}

	#[rstest]
	fn test_format_error_is_reported(session: Arc<MemorySession>) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		let result = flash.add_with("error", "%s and %s", "only one");

		assert!(matches!(result, Err(FlashError::Format(_))));
		assert!(flash.pending().is_empty());
	}

	#[rstest]
	#[case(json!(["a"]))]
	#[case(json!({"a": 1}))]
	#[case(json!(null))]
	fn test_add_json_rejects_non_scalar_message(session: Arc<MemorySession>, #[case] message: Value) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		let result = flash.add_json(&message, &Value::Null, &json!("error"), false);

		assert!(matches!(result, Err(FlashError::InvalidMessage(_))));
	}

	#[rstest]
	#[case(json!(1))]
	#[case(json!(["error"]))]
	#[case(json!(null))]
	fn test_add_json_rejects_non_string_type(session: Arc<MemorySession>, #[case] message_type: Value) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		let result = flash.add_json(&json!("text"), &Value::Null, &message_type, false);

		assert!(matches!(result, Err(FlashError::InvalidMessage(_))));
	}

	#[rstest]
	fn test_dispatch_conventions(session: Arc<MemorySession>) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());

		flash.dispatch("alert", &[json!("Deferred")]).unwrap();
		flash
			.dispatch("alert_now", &[json!("Hi %s, you have %d messages"), json!(["Ana", 4])])
			.unwrap();

		assert_eq!(flash.pending().get("alert").unwrap(), ["Deferred"]);
		assert_eq!(
			flash.immediate().get("alert").unwrap(),
			["Hi Ana, you have 4 messages"]
		);
	}

	#[rstest]
	fn test_dispatch_without_arguments(session: Arc<MemorySession>) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		let result = flash.dispatch("success_now", &[]);

		assert!(matches!(result, Err(FlashError::MissingArgument(name)) if name == "success_now"));
	}

	#[rstest]
	fn test_display_unknown_type_is_empty(session: Arc<MemorySession>) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		flash.error_now("Bad").unwrap();

		assert_eq!(flash.display("nonexistent-type", None).unwrap(), "");
	}

	#[rstest]
	fn test_persisted_before_immediate(session: Arc<MemorySession>) {
		messenger(&session, FlashConfigOverrides::default())
			.error("from last request")
			.unwrap();
		session.next_request();

		let mut flash = messenger(&session, FlashConfigOverrides::default());
		flash.error_now("from this request").unwrap();

		assert_eq!(
			flash.display("error", Some(false)).unwrap(),
			"<div><ul><li>from last request</li><li>from this request</li></ul></div>"
		);
	}

	#[rstest]
	fn test_display_does_not_accumulate_form_errors(session: Arc<MemorySession>) {
		let errors = Arc::new(vec!["Field is required".to_string()]);
		let mut flash = FlashMessenger::new(
			FlashContext::new()
				.with_session(session.clone())
				.with_validation(errors),
			FlashConfigOverrides::default(),
		)
		.unwrap();
		flash.error_now("Bad").unwrap();

		let first = flash.display_all().unwrap();
		let second = flash.display_all().unwrap();

		assert_eq!(first, second);
		assert_eq!(flash.immediate().get("error").unwrap(), ["Bad"]);
	}

	#[rstest]
	#[case("", true, "<div><ul><li>Field is required</li></ul></div>")]
	#[case("error", true, "<div><ul><li>Field is required</li></ul></div>")]
	#[case("form", true, "<div><ul><li>Field is required</li></ul></div>")]
	#[case("", false, "<div><ul><li>Field is required</li></ul></div>")]
	#[case("form", false, "<div><ul><li>Field is required</li></ul></div>")]
	#[case("error", false, "")]
	#[case("success", true, "")]
	fn test_form_error_routing(
		session: Arc<MemorySession>,
		#[case] message_type: &str,
		#[case] merge: bool,
		#[case] expected: &str,
	) {
		let mut errors = FormErrors::new();
		errors.add("name", "Field is required");

		let flash = FlashMessenger::new(
			FlashContext::new()
				.with_session(session.clone())
				.with_validation(Arc::new(errors)),
			FlashConfigOverrides::default().with_merge_form_errors(merge),
		)
		.unwrap();

		assert_eq!(flash.display(message_type, Some(false)).unwrap(), expected);
	}

	#[rstest]
	fn test_session_backend_requires_session() {
		let result = FlashMessenger::new(FlashContext::new(), FlashConfigOverrides::default());

		assert!(matches!(
			result,
			Err(FlashError::Config(ConfigError::MissingCollaborator("session", _)))
		));
	}

	#[rstest]
	fn test_cookie_backend_requires_jar(session: Arc<MemorySession>) {
		let result = FlashMessenger::new(
			FlashContext::new().with_session(session),
			FlashConfigOverrides::default().with_storage(StorageBackend::Cookie),
		);

		assert!(matches!(
			result,
			Err(FlashError::Config(ConfigError::MissingCollaborator("cookie", _)))
		));
	}

	#[rstest]
	fn test_cookie_backend_is_selected() {
		let jar = Arc::new(MemoryCookieJar::new());
		let flash = FlashMessenger::new(
			FlashContext::new().with_cookies(jar.clone()),
			FlashConfigOverrides::default().with_storage(StorageBackend::Cookie),
		)
		.unwrap();

		assert_eq!(flash.backend(), StorageBackend::Cookie);
		assert_eq!(jar.outgoing("flash").as_deref(), Some(""));
	}

	#[rstest]
	fn test_add_default_uses_default_type(session: Arc<MemorySession>) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		flash.add_default("Profile updated").unwrap();

		assert_eq!(
			session.pending("flash"),
			Some(json!({"default": ["Profile updated"]}))
		);
	}

	#[rstest]
	fn test_add_with_usize_count(session: Arc<MemorySession>) {
		let files = ["a.txt", "b.txt", "c.txt"];
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		flash.add_with("info", "%d files uploaded", files.len()).unwrap();

		assert_eq!(flash.pending().get("info").unwrap(), ["3 files uploaded"]);
	}

	#[rstest]
	fn test_config_mut_changes_rendering(session: Arc<MemorySession>) {
		let mut flash = messenger(&session, FlashConfigOverrides::default());
		flash.add_now(DEFAULT_TYPE, "x").unwrap();
		flash.config_mut().split_default = true;

		assert_eq!(flash.display_all().unwrap(), "<div>x</div>");
	}
}
