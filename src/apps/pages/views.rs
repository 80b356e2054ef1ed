//! Static pages.

use blogicum_core::Result;
use blogicum_http::{Request, Response};
use tera::Context;

use crate::config::state::AppState;
use crate::config::templates::render;

pub async fn about(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	render(&request, &state, "pages/about.html", Context::new())
}

pub async fn rules(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	render(&request, &state, "pages/rules.html", Context::new())
}
