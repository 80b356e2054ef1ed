use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::field::{FieldError, FieldResult, FormField, Widget, value_as_str};

/// Canonical format of cleaned values.
pub const CLEANED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const INVALID_DATETIME: &str = "Введите правильную дату и время.";

/// DateTimeField for date and time input
pub struct DateTimeField {
	pub name: String,
	pub label: Option<String>,
	pub required: bool,
	pub help_text: Option<String>,
	pub widget: Widget,
	pub input_formats: Vec<String>,
}

impl DateTimeField {
	/// Create a required date/time field rendered as `datetime-local`.
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_forms::fields::DateTimeField;
	/// use blogicum_forms::FormField;
	/// use serde_json::json;
	///
	/// let field = DateTimeField::new("pub_date");
	/// assert_eq!(
	///     field.clean(Some(&json!("2024-05-01T09:30"))).unwrap(),
	///     json!("2024-05-01T09:30:00")
	/// );
	/// ```
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			label: None,
			required: true,
			help_text: None,
			widget: Widget::DateTimeInput,
			input_formats: vec![
				"%Y-%m-%dT%H:%M".to_string(),
				"%Y-%m-%dT%H:%M:%S".to_string(),
				"%Y-%m-%d %H:%M:%S".to_string(),
				"%Y-%m-%d %H:%M".to_string(),
				"%d.%m.%Y %H:%M:%S".to_string(),
				"%d.%m.%Y %H:%M".to_string(),
				"%d.%m.%y %H:%M".to_string(),
			],
		}
	}

	pub fn optional(mut self) -> Self {
		self.required = false;
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

	fn parse_datetime(&self, s: &str) -> Option<NaiveDateTime> {
		for fmt in &self.input_formats {
			if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
				return Some(dt);
			}
		}
		// A bare date means midnight
		["%Y-%m-%d", "%d.%m.%Y"]
			.iter()
			.find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
			.and_then(|d| d.and_hms_opt(0, 0, 0))
	}
}

impl FormField for DateTimeField {
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
		let s = value_as_str(value)?.unwrap_or("").trim();
		if s.is_empty() {
			if self.required {
				return Err(FieldError::required(None));
			}
			return Ok(Value::Null);
		}

		let dt = self
			.parse_datetime(s)
			.ok_or_else(|| FieldError::validation(INVALID_DATETIME))?;

		Ok(Value::String(dt.format(CLEANED_FORMAT).to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("2025-01-15T14:30", "2025-01-15T14:30:00")]
	#[case("2025-01-15T14:30:05", "2025-01-15T14:30:05")]
	#[case("2025-01-15 14:30:00", "2025-01-15T14:30:00")]
	#[case("15.01.2025 14:30", "2025-01-15T14:30:00")]
	#[case("2025-01-15", "2025-01-15T00:00:00")]
	fn test_accepted_formats(#[case] input: &str, #[case] expected: &str) {
		let field = DateTimeField::new("pub_date");
		assert_eq!(field.clean(Some(&json!(input))).unwrap(), json!(expected));
	}

	#[rstest]
	#[case("tomorrow")]
	#[case("2025-13-01T10:00")]
	#[case("2025-02-30 10:00")]
	fn test_invalid_values(#[case] input: &str) {
		let field = DateTimeField::new("pub_date");
		assert_eq!(
			field.clean(Some(&json!(input))).unwrap_err(),
			FieldError::validation(INVALID_DATETIME)
		);
	}

	#[rstest]
	fn test_required_and_optional() {
		assert!(matches!(
			DateTimeField::new("pub_date").clean(None),
			Err(FieldError::Required(_))
		));
		assert_eq!(
			DateTimeField::new("pub_date").optional().clean(Some(&json!(" "))).unwrap(),
			Value::Null
		);
	}
}
