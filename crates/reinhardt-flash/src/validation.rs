//! Form validation errors shown alongside flash messages

use indexmap::IndexMap;

/// Provider of the current request's validation errors
pub trait ValidationErrorSource: Send + Sync {
	/// Error messages in display order
	fn current_validation_errors(&self) -> Vec<String>;
}

impl ValidationErrorSource for Vec<String> {
	fn current_validation_errors(&self) -> Vec<String> {
		self.clone()
	}
}

/// Validation errors collected while processing a form
///
/// # Examples
///
/// ```
/// use reinhardt_flash::validation::{FormErrors, ValidationErrorSource};
///
/// let mut errors = FormErrors::new();
/// errors.add("email", "Enter a valid email address.");
/// errors.add_non_field("Passwords do not match.");
/// errors.add("email", "This field is required.");
///
/// assert_eq!(
///     errors.current_validation_errors(),
///     vec![
///         "Passwords do not match.",
///         "Enter a valid email address.",
///         "This field is required.",
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
	non_field: Vec<String>,
	fields: IndexMap<String, Vec<String>>,
}

impl FormErrors {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record an error for `field`
	pub fn add(&mut self, field: impl Into<String>, error: impl Into<String>) {
		self.fields
			.entry(field.into())
			.or_default()
			.push(error.into());
	}

	/// Record an error that belongs to the form as a whole
	pub fn add_non_field(&mut self, error: impl Into<String>) {
		self.non_field.push(error.into());
	}

	/// Errors recorded for `field`
	pub fn field(&self, field: &str) -> &[String] {
		self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
	}

	pub fn is_empty(&self) -> bool {
		self.non_field.is_empty() && self.fields.values().all(Vec::is_empty)
	}
}

impl<K, V> FromIterator<(K, V)> for FormErrors
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut errors = Self::new();
		for (field, error) in iter {
			errors.add(field, error);
		}
		errors
	}
}

impl ValidationErrorSource for FormErrors {
	fn current_validation_errors(&self) -> Vec<String> {
		self.non_field
			.iter()
			.chain(self.fields.values().flatten())
			.cloned()
			.collect()
	}
}

/// Collect errors from an optional source
///
/// A missing source yields nothing. Errors are trimmed and blank ones
/// dropped.
pub fn collect_errors(source: Option<&dyn ValidationErrorSource>) -> Vec<String> {
	let Some(source) = source else {
		return Vec::new();
	};

	source
		.current_validation_errors()
		.into_iter()
		.map(|error| error.trim().to_string())
		.filter(|error| !error.is_empty())
		.collect()
}
