use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::field::{FieldError, FieldResult, FormField, Widget, value_as_str};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
		.expect("EMAIL_RE: invalid regex pattern")
});

const INVALID_EMAIL: &str = "Введите правильный адрес электронной почты.";
const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Debug, Clone)]
pub struct EmailField {
	pub name: String,
	pub label: Option<String>,
	pub required: bool,
	widget: Widget,
}

impl EmailField {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			label: None,
			required: false,
			widget: Widget::EmailInput,
		}
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}
}

impl FormField for EmailField {
	fn name(&self) -> &str {
		&self.name
	}

	fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	fn required(&self) -> bool {
		self.required
	}

	fn widget(&self) -> &Widget {
		&self.widget
	}

	fn clean(&self, value: Option<&Value>) -> FieldResult<Value> {
		let v = value_as_str(value)?.unwrap_or("").trim();
		if v.is_empty() {
			if self.required {
				return Err(FieldError::required(None));
			}
			return Ok(Value::String(String::new()));
		}
		if v.len() > MAX_EMAIL_LENGTH || !EMAIL_RE.is_match(v) {
			return Err(FieldError::validation(INVALID_EMAIL));
		}
		// The domain part is case-insensitive
		let normalized = match v.rsplit_once('@') {
			Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
			None => v.to_string(),
		};
		Ok(Value::String(normalized))
	}
}
