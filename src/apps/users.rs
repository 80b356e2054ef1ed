//! User accounts and the authentication pages.

pub mod forms;
pub mod models;
pub mod urls;
pub mod views;
