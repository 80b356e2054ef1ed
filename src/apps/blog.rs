//! The blog: feed, post pages, comments and user profiles.

pub mod forms;
pub mod models;
pub mod queries;
pub mod urls;
pub mod views;
