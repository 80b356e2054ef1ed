//! Project wiring: settings, database, templates, middleware and URLs.

pub mod application;
pub mod database;
pub mod middleware;
pub mod settings;
pub mod state;
pub mod templates;
pub mod urls;

pub use application::Application;
pub use settings::Settings;
pub use state::AppState;
