//! # Blogicum
//!
//! A blogging site: users publish posts in categories and locations,
//! readers browse paginated feeds and comment on posts.
//!
//! ## Layout
//!
//! - [`apps::blog`]: posts, categories, locations, comments and their views
//! - [`apps::users`]: registration, login and logout
//! - [`apps::pages`]: static pages
//! - [`config`]: settings, routing, middleware, templates and the
//!   [`Application`](config::Application) that ties them together
//! - `test_utils`: an in-process test client, database helpers and
//!   factories (unit tests and the `test-utils` feature only)
//!
//! ## Running
//!
//! ```text
//! manage migrate
//! manage createsuperuser --username admin --email admin@example.com
//! manage runserver --addr 127.0.0.1:8000
//! ```

pub mod apps;
pub mod config;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{AppState, Application, Settings};
