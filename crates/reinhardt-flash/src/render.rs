//! HTML rendering of message stores
//!
//! Message text is inserted verbatim; callers must only flash HTML-safe
//! content.

use crate::config::FlashConfig;
use crate::store::MessageStore;

/// Render every type in `store` using the styles of `config`
///
/// Grouped mode wraps each type in its style around a `<ul>` list; split mode
/// wraps every message in the style on its own.
///
/// # Examples
///
/// ```
/// use reinhardt_flash::config::{FlashConfig, Style};
/// use reinhardt_flash::{MessageStore, render_messages};
///
/// let mut config = FlashConfig::default();
/// config.styles.insert("error".to_string(), Style::new("<p class=e>", "</p>"));
///
/// let mut store = MessageStore::new();
/// store.push("error", "Bad input");
/// store.push("error", "Try again");
///
/// assert_eq!(
///     render_messages(&store, &config, false),
///     "<p class=e><ul><li>Bad input</li><li>Try again</li></ul></p>"
/// );
/// assert_eq!(
///     render_messages(&store, &config, true),
///     "<p class=e>Bad input</p><p class=e>Try again</p>"
/// );
/// ```
pub fn render_messages(store: &MessageStore, config: &FlashConfig, split: bool) -> String {
	let mut output = String::new();

	for (message_type, messages) in store.iter() {
		let style = config.style_for(message_type);

		if split {
			for message in messages {
				output.push_str(&style.prefix);
				output.push_str(message);
				output.push_str(&style.suffix);
			}
		} else {
			output.push_str(&style.prefix);
			output.push_str("<ul>");
			for message in messages {
				output.push_str("<li>");
				output.push_str(message);
				output.push_str("</li>");
			}
			output.push_str("</ul>");
			output.push_str(&style.suffix);
		}
	}

	output
}
