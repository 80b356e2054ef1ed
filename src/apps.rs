//! Project applications.
//!
//! - [`blog`]: posts, categories, locations and comments
//! - [`users`]: registration, login and logout
//! - [`pages`]: static pages

pub mod blog;
pub mod pages;
pub mod users;
