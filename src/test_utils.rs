//! Helpers shared by unit tests and the end-to-end tests in `tests/`.
//!
//! - [`database`]: in-memory SQLite with migrations applied
//! - [`factories`]: rows with sensible defaults
//! - [`client`]: an in-process HTTP client that keeps cookies

pub mod client;
pub mod database;
pub mod factories;

pub use client::TestClient;
