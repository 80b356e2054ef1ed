//! Concrete form fields.

mod char_field;
mod datetime_field;
mod email_field;
mod image_field;
mod model_choice_field;

pub use char_field::CharField;
pub use datetime_field::{CLEANED_FORMAT, DateTimeField};
pub use email_field::EmailField;
pub use image_field::{IMAGE_EXTENSIONS, ImageField};
pub use model_choice_field::ModelChoiceField;
