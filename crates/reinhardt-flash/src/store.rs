//! Ordered message buckets keyed by message type

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages grouped by type
///
/// Types keep the order in which they were first used, and messages keep
/// their insertion order within a type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageStore {
	messages: IndexMap<String, Vec<String>>,
}

impl MessageStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append `message` to the `message_type` bucket
	pub fn push(&mut self, message_type: impl Into<String>, message: impl Into<String>) {
		self.messages
			.entry(message_type.into())
			.or_default()
			.push(message.into());
	}

	/// Messages of one type, if any were added
	pub fn get(&self, message_type: &str) -> Option<&[String]> {
		self.messages.get(message_type).map(Vec::as_slice)
	}

	pub fn contains_type(&self, message_type: &str) -> bool {
		self.messages.contains_key(message_type)
	}

	/// Message types in order of first use
	pub fn types(&self) -> impl Iterator<Item = &str> {
		self.messages.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.messages
			.iter()
			.map(|(message_type, messages)| (message_type.as_str(), messages.as_slice()))
	}

	/// Whether no message of any type is held
	pub fn is_empty(&self) -> bool {
		self.messages.values().all(Vec::is_empty)
	}

	/// Total number of messages across all types
	pub fn len(&self) -> usize {
		self.messages.values().map(Vec::len).sum()
	}

	pub fn clear(&mut self) {
		self.messages.clear();
	}

	/// Keep only the `message_type` bucket
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_flash::MessageStore;
	///
	/// let mut store = MessageStore::new();
	/// store.push("error", "Bad input");
	/// store.push("success", "Saved");
	///
	/// let errors = store.restrict_to("error");
	/// assert_eq!(errors.types().collect::<Vec<_>>(), vec!["error"]);
	/// assert!(store.restrict_to("warning").is_empty());
	/// ```
	pub fn restrict_to(&self, message_type: &str) -> Self {
		let mut restricted = Self::new();
		if let Some((key, messages)) = self.messages.get_key_value(message_type) {
			restricted.messages.insert(key.clone(), messages.clone());
		}
		restricted
	}

	/// Combine `earlier` with this store, `earlier` messages first
	///
	/// Type order follows `earlier`, followed by types only present here.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_flash::MessageStore;
	///
	/// let mut persisted = MessageStore::new();
	/// persisted.push("success", "Saved");
	/// persisted.push("error", "Old error");
	///
	/// let mut current = MessageStore::new();
	/// current.push("error", "New error");
	/// current.push("info", "Heads up");
	///
	/// let merged = current.merge_under(persisted);
	/// assert_eq!(merged.types().collect::<Vec<_>>(), vec!["success", "error", "info"]);
	/// assert_eq!(merged.get("error").unwrap(), ["Old error", "New error"]);
	/// ```
	pub fn merge_under(self, earlier: MessageStore) -> Self {
		let mut merged = earlier;
		for (message_type, messages) in self.messages {
			match merged.messages.entry(message_type) {
				Entry::Occupied(mut entry) => entry.get_mut().extend(messages),
				Entry::Vacant(entry) => {
					entry.insert(messages);
				}
			}
		}
		merged
	}

	/// Decode a stored mapping without failing
	///
	/// Anything other than a JSON object decodes to an empty store. A scalar
	/// entry becomes a one-message bucket, and non-scalar list items are
	/// dropped.
	pub fn from_value_lossy(value: &Value) -> Self {
		let mut store = Self::new();
		let Value::Object(map) = value else {
			return store;
		};

		for (message_type, entry) in map {
			let messages: Vec<String> = match entry {
				Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
				other => scalar_to_string(other).into_iter().collect(),
			};
			if !messages.is_empty() {
				store.messages.insert(message_type.clone(), messages);
			}
		}
		store
	}

	pub fn to_value(&self) -> Value {
		Value::Object(
			self.messages
				.iter()
				.map(|(message_type, messages)| {
					(
						message_type.clone(),
						Value::Array(messages.iter().cloned().map(Value::String).collect()),
					)
				})
				.collect(),
		)
	}
}

fn scalar_to_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(true) => Some("1".to_string()),
		Value::Bool(false) => Some(String::new()),
		Value::Null | Value::Array(_) | Value::Object(_) => None,
	}
}

impl<'a> IntoIterator for &'a MessageStore {
	type Item = (&'a String, &'a Vec<String>);
	type IntoIter = indexmap::map::Iter<'a, String, Vec<String>>;

	fn into_iter(self) -> Self::IntoIter {
		self.messages.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_push_keeps_order() {
		let mut store = MessageStore::new();
		store.push("success", "first");
		store.push("error", "second");
		store.push("success", "third");

		assert_eq!(store.types().collect::<Vec<_>>(), vec!["success", "error"]);
		assert_eq!(store.get("success").unwrap(), ["first", "third"]);
		assert_eq!(store.len(), 3);
	}

	#[rstest]
	fn test_restrict_to_missing_type_is_empty() {
		let mut store = MessageStore::new();
		store.push("error", "oops");

		let restricted = store.restrict_to("nonexistent-type");
		assert!(restricted.is_empty());
		assert_eq!(restricted.types().count(), 0);
	}

	#[rstest]
	fn test_merge_under_empty_stores() {
		let merged = MessageStore::new().merge_under(MessageStore::new());
		assert!(merged.is_empty());
	}

	#[rstest]
	fn test_value_round_trip_preserves_order() {
		let mut store = MessageStore::new();
		store.push("warning", "w1");
		store.push("error", "e1");
		store.push("warning", "w2");
		store.push("error", "e2");

		let decoded = MessageStore::from_value_lossy(&store.to_value());
		assert_eq!(decoded, store);
		assert_eq!(decoded.types().collect::<Vec<_>>(), vec!["warning", "error"]);
	}

	#[rstest]
	#[case(json!(null))]
	#[case(json!("corrupt"))]
	#[case(json!([1, 2, 3]))]
	#[case(json!(false))]
	fn test_non_mapping_decodes_to_empty(#[case] value: Value) {
		assert!(MessageStore::from_value_lossy(&value).is_empty());
	}

	#[rstest]
	fn test_lossy_decoding_of_entries() {
		let value = json!({
			"error": "single",
			"success": ["ok", 3, true, null, ["nested"]],
			"empty": [],
		});

		let store = MessageStore::from_value_lossy(&value);

		assert_eq!(store.get("error").unwrap(), ["single"]);
		assert_eq!(store.get("success").unwrap(), ["ok", "3", "1"]);
		assert!(!store.contains_type("empty"));
	}

	#[rstest]
	fn test_serde_is_a_plain_mapping() {
		let mut store = MessageStore::new();
		store.push("error", "Bad input");

		let json = serde_json::to_string(&store).unwrap();
		assert_eq!(json, r#"{"error":["Bad input"]}"#);

		let back: MessageStore = serde_json::from_str(&json).unwrap();
		assert_eq!(back, store);
	}
}
