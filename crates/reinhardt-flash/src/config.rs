//! Flash messenger configuration
//!
//! Configuration is layered: built-in defaults, then the global `flash`
//! entry of a [`ConfigSource`], then explicit [`FlashConfigOverrides`].
//! Later layers replace whole fields of earlier ones.
//!
//! ```
//! use reinhardt_flash::config::{FlashConfig, FlashConfigOverrides, StaticConfigSource};
//!
//! let global = StaticConfigSource::from_toml(
//!     r#"
//! [flash]
//! split_default = true
//! styles = { error = ["<p class=\"error\">", "</p>"] }
//! "#,
//! )
//! .unwrap();
//!
//! let overrides = FlashConfigOverrides {
//!     session_name: Some("notices".to_string()),
//!     ..Default::default()
//! };
//!
//! let config = FlashConfig::resolve(Some(&global), overrides).unwrap();
//! assert_eq!(config.session_name, "notices");
//! assert!(config.split_default);
//! assert_eq!(config.style_for("error").prefix, "<p class=\"error\">");
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which the global flash configuration is looked up
pub const CONFIG_KEY: &str = "flash";

/// Default session (and cookie) slot name
pub const DEFAULT_SESSION_NAME: &str = "flash";

/// Configuration errors
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid flash configuration: {0}")]
	Invalid(#[from] serde_json::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid session name {0:?}: must be a non-empty cookie-name token")]
	InvalidSessionName(String),

	#[error("The {0} storage backend requires a {1} in the flash context")]
	MissingCollaborator(&'static str, &'static str),
}

/// HTML wrapped around a message (split mode) or a message group
///
/// Serialized as a two-element array: `["<div>", "</div>"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Style {
	pub prefix: String,
	pub suffix: String,
}

impl Style {
	/// Create a style from its opening and closing markup
	pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
			suffix: suffix.into(),
		}
	}
}

impl Default for Style {
	fn default() -> Self {
		Self::new("<div>", "</div>")
	}
}

impl From<(String, String)> for Style {
	fn from((prefix, suffix): (String, String)) -> Self {
		Self { prefix, suffix }
	}
}

impl From<Style> for (String, String) {
	fn from(style: Style) -> Self {
		(style.prefix, style.suffix)
	}
}

impl From<(&str, &str)> for Style {
	fn from((prefix, suffix): (&str, &str)) -> Self {
		Self::new(prefix, suffix)
	}
}

/// Where deferred messages are persisted between requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	/// Session flashdata, readable on the next request only
	#[default]
	Session,
	/// A base64-encoded JSON cookie named after `session_name`
	Cookie,
}

impl StorageBackend {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Session => "session",
			Self::Cookie => "cookie",
		}
	}
}

/// Resolved flash messenger configuration
///
/// Fields are public; an embedding application may adjust them on a live
/// messenger through [`FlashMessenger::config_mut`](crate::FlashMessenger::config_mut).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashConfig {
	/// Session flashdata key, also used as the cookie name
	pub session_name: String,
	/// Style used for types without an entry in `styles`
	pub default_style: Style,
	/// Per-type styles
	pub styles: IndexMap<String, Style>,
	/// Render each message separately unless told otherwise
	pub split_default: bool,
	/// Fold form validation errors into the `error` type
	pub merge_form_errors: bool,
	pub storage_type: StorageBackend,
}

impl Default for FlashConfig {
	fn default() -> Self {
		Self {
			session_name: DEFAULT_SESSION_NAME.to_string(),
			default_style: Style::default(),
			styles: IndexMap::new(),
			split_default: false,
			merge_form_errors: true,
			storage_type: StorageBackend::Session,
		}
	}
}

/// Optional configuration fields
///
/// Deserializing ignores unknown keys, so a larger settings object can be
/// handed over as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashConfigOverrides {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub default_style: Option<Style>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub styles: Option<IndexMap<String, Style>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub split_default: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub merge_form_errors: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub storage_type: Option<StorageBackend>,
}

impl FlashConfigOverrides {
	/// Parse overrides from a JSON value
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_flash::config::{FlashConfigOverrides, StorageBackend};
	/// use serde_json::json;
	///
	/// let overrides = FlashConfigOverrides::from_value(json!({
	///     "storage_type": "cookie",
	///     "unrelated_setting": 42,
	/// }))
	/// .unwrap();
	/// assert_eq!(overrides.storage_type, Some(StorageBackend::Cookie));
	/// ```
	pub fn from_value(value: Value) -> Result<Self, ConfigError> {
		Ok(serde_json::from_value(value)?)
	}

	pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
		self.session_name = Some(name.into());
		self
	}

	pub fn with_default_style(mut self, style: impl Into<Style>) -> Self {
		self.default_style = Some(style.into());
		self
	}

	/// Add one per-type style, keeping any styles already set here
	pub fn with_style(mut self, message_type: impl Into<String>, style: impl Into<Style>) -> Self {
		self.styles
			.get_or_insert_with(IndexMap::new)
			.insert(message_type.into(), style.into());
		self
	}

	pub fn with_split_default(mut self, split: bool) -> Self {
		self.split_default = Some(split);
		self
	}

	pub fn with_merge_form_errors(mut self, merge: bool) -> Self {
		self.merge_form_errors = Some(merge);
		self
	}

	pub fn with_storage(mut self, backend: StorageBackend) -> Self {
		self.storage_type = Some(backend);
		self
	}
}

impl FlashConfig {
	/// Replace every field that `overrides` sets
	pub fn apply(&mut self, overrides: FlashConfigOverrides) {
		if let Some(session_name) = overrides.session_name {
			self.session_name = session_name;
		}
		if let Some(default_style) = overrides.default_style {
			self.default_style = default_style;
		}
		if let Some(styles) = overrides.styles {
			self.styles = styles;
		}
		if let Some(split_default) = overrides.split_default {
			self.split_default = split_default;
		}
		if let Some(merge_form_errors) = overrides.merge_form_errors {
			self.merge_form_errors = merge_form_errors;
		}
		if let Some(storage_type) = overrides.storage_type {
			self.storage_type = storage_type;
		}
	}

	/// Build the effective configuration
	///
	/// Precedence: defaults < `global[CONFIG_KEY]` < `overrides`. A global
	/// entry that is not an object is ignored; an object with badly typed
	/// fields is an error.
	pub fn resolve(
		global: Option<&dyn ConfigSource>,
		overrides: FlashConfigOverrides,
	) -> Result<Self, ConfigError> {
		let mut config = Self::default();

		if let Some(value) = global.and_then(|source| source.get(CONFIG_KEY)) {
			if value.is_object() {
				config.apply(FlashConfigOverrides::from_value(value)?);
			} else {
				tracing::debug!(
					"Ignoring non-object global `{}` configuration entry",
					CONFIG_KEY
				);
			}
		}

		config.apply(overrides);
		config.validate()?;
		Ok(config)
	}

	/// Check the invariants the storage backends rely on
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !is_cookie_token(&self.session_name) {
			return Err(ConfigError::InvalidSessionName(self.session_name.clone()));
		}
		Ok(())
	}

	/// Style for `message_type`, falling back to `default_style`
	pub fn style_for(&self, message_type: &str) -> &Style {
		self.styles
			.get(message_type)
			.unwrap_or(&self.default_style)
	}
}

/// RFC 6265 cookie-name token: visible ASCII minus separators
fn is_cookie_token(name: &str) -> bool {
	const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={} \t";

	!name.is_empty()
		&& name
			.bytes()
			.all(|b| b.is_ascii_graphic() && !SEPARATORS.contains(&b))
}

/// Read-only key/value lookup providing framework-wide settings
pub trait ConfigSource: Send + Sync {
	fn get(&self, key: &str) -> Option<Value>;
}

impl ConfigSource for IndexMap<String, Value> {
	fn get(&self, key: &str) -> Option<Value> {
		IndexMap::get(self, key).cloned()
	}
}

impl ConfigSource for serde_json::Map<String, Value> {
	fn get(&self, key: &str) -> Option<Value> {
		serde_json::Map::get(self, key).cloned()
	}
}

/// Settings held in memory, typically loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
	values: IndexMap<String, Value>,
}

impl StaticConfigSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set a top-level key
	pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}

	/// Load settings from a TOML document
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_flash::config::{ConfigSource, StaticConfigSource};
	///
	/// let source = StaticConfigSource::from_toml("[flash]\nsession_name = \"notices\"").unwrap();
	/// let flash = source.get("flash").unwrap();
	/// assert_eq!(flash["session_name"], "notices");
	/// ```
	pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
		let values: IndexMap<String, Value> = toml::from_str(document)?;
		Ok(Self { values })
	}
}

impl ConfigSource for StaticConfigSource {
	fn get(&self, key: &str) -> Option<Value> {
		self.values.get(key).cloned()
	}
}
