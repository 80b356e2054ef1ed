//! One-shot notifications ("flash messages").
//!
//! A handler queues a [`Message`] while processing a request; the message is
//! kept in the visitor's session and shown exactly once on the next page that
//! renders the message list.

use serde::{Deserialize, Serialize};

/// Session key under which pending messages are stored.
pub const SESSION_KEY: &str = "_messages";

/// Message levels (similar to Django)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
	Debug,
	#[default]
	Info,
	Success,
	Warning,
	Error,
}

impl Level {
	/// Returns the string representation of the level
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_core::Level;
	///
	/// assert_eq!(Level::Success.as_str(), "success");
	/// assert_eq!(Level::Error.as_str(), "error");
	/// ```
	pub fn as_str(&self) -> &'static str {
		match self {
			Level::Debug => "debug",
			Level::Info => "info",
			Level::Success => "success",
			Level::Warning => "warning",
			Level::Error => "error",
		}
	}

	pub fn value(&self) -> i32 {
		match self {
			Level::Debug => 10,
			Level::Info => 20,
			Level::Success => 25,
			Level::Warning => 30,
			Level::Error => 40,
		}
	}

	/// CSS class used by the Bootstrap alert markup in templates.
	pub fn css_class(&self) -> &'static str {
		match self {
			Level::Debug => "secondary",
			Level::Info => "info",
			Level::Success => "success",
			Level::Warning => "warning",
			Level::Error => "danger",
		}
	}
}

impl PartialOrd for Level {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Level {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.value().cmp(&other.value())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
	pub level: Level,
	pub text: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub extra_tags: Vec<String>,
}

impl Message {
	pub fn new(level: Level, text: impl Into<String>) -> Self {
		Self {
			level,
			text: text.into(),
			extra_tags: Vec::new(),
		}
	}

	pub fn success(text: impl Into<String>) -> Self {
		Self::new(Level::Success, text)
	}

	pub fn error(text: impl Into<String>) -> Self {
		Self::new(Level::Error, text)
	}

	pub fn with_tags(mut self, tags: Vec<String>) -> Self {
		self.extra_tags = tags;
		self
	}

	/// Space separated tag string: extra tags followed by the level tag.
	///
	/// ```
	/// use blogicum_core::{Level, Message};
	///
	/// let msg = Message::new(Level::Error, "oops").with_tags(vec!["sticky".into()]);
	/// assert_eq!(msg.tags(), "sticky error");
	/// ```
	pub fn tags(&self) -> String {
		let mut tags = self.extra_tags.clone();
		tags.push(self.level.as_str().to_string());
		tags.join(" ")
	}
}

/// Serializable view of a message handed to templates.
#[derive(Debug, Clone, Serialize)]
pub struct MessageContext {
	pub text: String,
	pub level: &'static str,
	pub tags: String,
	pub css_class: &'static str,
}

impl From<&Message> for MessageContext {
	fn from(msg: &Message) -> Self {
		Self {
			text: msg.text.clone(),
			level: msg.level.as_str(),
			tags: msg.tags(),
			css_class: msg.level.css_class(),
		}
	}
}

/// Decodes the pending queue stored in a session value. Anything that does
/// not parse is treated as an empty queue.
pub fn decode_queue(value: Option<&serde_json::Value>) -> Vec<Message> {
	value
		.and_then(|v| serde_json::from_value(v.clone()).ok())
		.unwrap_or_default()
}

pub fn encode_queue(messages: &[Message]) -> serde_json::Result<serde_json::Value> {
	serde_json::to_value(messages)
}
