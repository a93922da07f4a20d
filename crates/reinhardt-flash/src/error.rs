//! Error types for the flash message framework

use crate::config::ConfigError;
use crate::format::FormatError;

/// Error raised by a storage collaborator (session service, cookie I/O)
///
/// The flash framework never inspects these errors; they are carried to the
/// caller unchanged.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by storage collaborators
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors produced by [`FlashMessenger`](crate::FlashMessenger)
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FlashError {
	/// The message was not a scalar, or the message type was not a string
	#[error("Invalid message type/value entered: {0}")]
	InvalidMessage(String),

	/// A `<type>` / `<type>_now` call was made without a message argument
	#[error("Missing message argument for `{0}`")]
	MissingArgument(String),

	#[error("Message formatting failed: {0}")]
	Format(#[from] FormatError),

	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	/// Storage collaborator failure, propagated as-is
	#[error("Storage backend error: {0}")]
	Backend(#[from] BackendError),
}

/// Result type for flash operations
pub type FlashResult<T> = Result<T, FlashError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_invalid_message_display() {
		let err = FlashError::InvalidMessage("array".to_string());
		assert_eq!(err.to_string(), "Invalid message type/value entered: array");
	}

	#[rstest]
	fn test_backend_error_keeps_source() {
		let inner: BackendError = "session service unavailable".into();
		let err = FlashError::from(inner);

		assert!(matches!(err, FlashError::Backend(_)));
		let source = std::error::Error::source(&err).map(|s| s.to_string());
		assert_eq!(source.as_deref(), Some("session service unavailable"));
	}
}
