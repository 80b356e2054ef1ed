//! Static pages.

pub mod urls;
pub mod views;
