//! Selection of one database row by primary key.

use serde_json::Value;

use crate::field::{FieldError, FieldResult, FormField, Widget};

const INVALID_CHOICE: &str =
	"Выберите корректный вариант. Вашего варианта нет среди допустимых значений.";

/// A `<select>` over a fixed set of rows, usually loaded from a filtered
/// query just before the form is built.
pub struct ModelChoiceField {
	pub name: String,
	pub label: Option<String>,
	pub required: bool,
	pub help_text: Option<String>,
	pub empty_label: Option<String>,
	choices: Vec<(i64, String)>,
	widget: Widget,
}

impl ModelChoiceField {
	/// # Examples
	///
	/// ```
	/// use blogicum_forms::fields::ModelChoiceField;
	/// use blogicum_forms::FormField;
	/// use serde_json::json;
	///
	/// let field = ModelChoiceField::new("category", vec![(1, "Путешествия".into())]).required();
	/// assert_eq!(field.clean(Some(&json!("1"))).unwrap(), json!(1));
	/// assert!(field.clean(Some(&json!("2"))).is_err());
	/// ```
	pub fn new(name: impl Into<String>, choices: Vec<(i64, String)>) -> Self {
		Self {
			name: name.into(),
			label: None,
			required: false,
			help_text: None,
			empty_label: Some("---------".to_string()),
			choices,
			widget: Widget::Select,
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

	pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
		self.help_text = Some(help_text.into());
		self
	}
}

impl FormField for ModelChoiceField {
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

	fn choices(&self) -> Vec<(String, String)> {
		let mut out = Vec::with_capacity(self.choices.len() + 1);
		if let Some(empty) = &self.empty_label {
			out.push((String::new(), empty.clone()));
		}
		out.extend(
			self.choices
				.iter()
				.map(|(id, label)| (id.to_string(), label.clone())),
		);
		out
	}

	fn clean(&self, value: Option<&Value>) -> FieldResult<Value> {
		let id = match value {
			None | Some(Value::Null) => None,
			Some(Value::Number(n)) => Some(n.as_i64().ok_or_else(|| FieldError::invalid(INVALID_CHOICE))?),
			Some(Value::String(s)) if s.trim().is_empty() => None,
			Some(Value::String(s)) => Some(
				s.trim()
					.parse::<i64>()
					.map_err(|_| FieldError::invalid(INVALID_CHOICE))?,
			),
			Some(_) => return Err(FieldError::invalid(INVALID_CHOICE)),
		};

		match id {
			None if self.required => Err(FieldError::required(None)),
			None => Ok(Value::Null),
			Some(id) if self.choices.iter().any(|(choice, _)| *choice == id) => Ok(Value::from(id)),
			Some(_) => Err(FieldError::invalid(INVALID_CHOICE)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn locations() -> ModelChoiceField {
		ModelChoiceField::new(
			"location",
			vec![(3, "Москва".to_string()), (7, "Остров".to_string())],
		)
	}

	#[rstest]
	#[case(json!("3"), json!(3))]
	#[case(json!(7), json!(7))]
	#[case(json!(""), Value::Null)]
	fn test_valid_choices(locations: ModelChoiceField, #[case] input: Value, #[case] expected: Value) {
		assert_eq!(locations.clean(Some(&input)).unwrap(), expected);
	}

	#[rstest]
	#[case(json!("4"))]
	#[case(json!("abc"))]
	#[case(json!(true))]
	fn test_invalid_choices(locations: ModelChoiceField, #[case] input: Value) {
		assert_eq!(
			locations.clean(Some(&input)).unwrap_err(),
			FieldError::invalid(INVALID_CHOICE)
		);
	}

	#[rstest]
	fn test_required_choice(locations: ModelChoiceField) {
		let field = locations.required();
		assert!(matches!(field.clean(None), Err(FieldError::Required(_))));
	}

	#[rstest]
	fn test_choices_start_with_empty_label(locations: ModelChoiceField) {
		let choices = locations.choices();

		assert_eq!(choices.len(), 3);
		assert_eq!(choices[0], (String::new(), "---------".to_string()));
		assert_eq!(choices[1], ("3".to_string(), "Москва".to_string()));
	}
}
