//! Character field for text input

use regex::Regex;
use serde_json::Value;

use crate::field::{FieldError, FieldResult, FormField, Widget, value_as_str};

/// Character field with length validation
#[derive(Debug, Clone)]
pub struct CharField {
	pub name: String,
	pub label: Option<String>,
	pub required: bool,
	pub help_text: Option<String>,
	pub widget: Widget,
	pub max_length: Option<usize>,
	pub min_length: Option<usize>,
	pub strip: bool,
	validators: Vec<(Regex, String)>,
}

impl CharField {
	/// Create an optional single-line text field.
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_forms::fields::CharField;
	///
	/// let field = CharField::new("title").required().with_max_length(256);
	/// assert_eq!(field.name, "title");
	/// assert!(field.required);
	/// assert_eq!(field.max_length, Some(256));
	/// ```
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			label: None,
			required: false,
			help_text: None,
			widget: Widget::TextInput,
			max_length: None,
			min_length: None,
			strip: true,
			validators: Vec::new(),
		}
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	pub fn with_max_length(mut self, max_length: usize) -> Self {
		self.max_length = Some(max_length);
		self
	}

	pub fn with_min_length(mut self, min_length: usize) -> Self {
		self.min_length = Some(min_length);
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
		self.help_text = Some(help_text.into());
		self
	}

	/// Keep leading and trailing whitespace (used for passwords).
	pub fn no_strip(mut self) -> Self {
		self.strip = false;
		self
	}

	pub fn with_widget(mut self, widget: Widget) -> Self {
		self.widget = widget;
		self
	}

	/// Adds a pattern the whole value must match.
	pub fn with_validator(mut self, pattern: Regex, message: impl Into<String>) -> Self {
		self.validators.push((pattern, message.into()));
		self
	}
}

impl FormField for CharField {
	fn name(&self) -> &str {
		&self.name
	}

	fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	fn required(&self) -> bool {
		self.required
	}

	fn help_text(&self) -> Option<&str> {
		self.help_text.as_deref()
	}

	fn widget(&self) -> &Widget {
		&self.widget
	}

	fn clean(&self, value: Option<&Value>) -> FieldResult<Value> {
		let raw = value_as_str(value)?.unwrap_or("");
		let v = if self.strip { raw.trim() } else { raw };

		if v.is_empty() {
			if self.required {
				return Err(FieldError::required(None));
			}
			return Ok(Value::String(String::new()));
		}

		// Length is counted in characters, not bytes
		let char_count = v.chars().count();
		if let Some(max_length) = self.max_length {
			if char_count > max_length {
				return Err(FieldError::validation(format!(
					"Убедитесь, что это значение содержит не более {} символов (сейчас {}).",
					max_length, char_count
				)));
			}
		}
		if let Some(min_length) = self.min_length {
			if char_count < min_length {
				return Err(FieldError::validation(format!(
					"Убедитесь, что это значение содержит не менее {} символов (сейчас {}).",
					min_length, char_count
				)));
			}
		}

		for (pattern, message) in &self.validators {
			if !pattern.is_match(v) {
				return Err(FieldError::validation(message.clone()));
			}
		}

		Ok(Value::String(v.to_string()))
	}
}
