//! Form handling for Blogicum.
//!
//! A [`Form`] is a list of [`FormField`]s bound to submitted data (and
//! uploaded files). [`Form::is_valid`] cleans every field, runs form-wide
//! checks and collects errors; [`Form::context`] produces a serializable
//! value the templates render.

pub mod field;
pub mod fields;
pub mod form;

pub use field::{FieldError, FieldResult, FormField, REQUIRED_MESSAGE, Widget};
pub use form::{
	ALL_FIELDS_KEY, BoundFieldContext, CLEAR_SUFFIX, ChoiceContext, Form, FormContext, FormError,
	FormResult,
};
