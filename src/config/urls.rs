//! Root URL configuration.

use blogicum_core::Result;
use blogicum_http::{MediaHandler, MediaStorage, Router};
use std::sync::Arc;

use crate::apps::{blog, pages, users};
use crate::config::settings::Settings;

/// Storage for uploaded files as configured in `settings`.
pub fn media_storage(settings: &Settings) -> MediaStorage {
	MediaStorage::new(settings.media_root.clone())
		.with_url_prefix(&settings.media_url)
		.with_max_size(settings.max_upload_size)
}

/// Every route of the project.
///
/// | prefix    | namespace |
/// |-----------|-----------|
/// | `/`       | `blog`    |
/// | `/auth/`  | `users`   |
/// | `/pages/` | `pages`   |
///
/// Uploaded files are served from `media_url` when `serve_media` is set.
pub fn url_patterns(settings: &Settings) -> Result<Router> {
	let mut router = Router::new()
		.include("/pages/", pages::urls::url_patterns()?)?
		.include("/auth/", users::urls::url_patterns()?)?
		.include("/", blog::urls::url_patterns()?)?;

	if settings.serve_media {
		let pattern = format!("{}{{path:*}}", settings.media_url);
		router = router.route(
			&pattern,
			Some("media"),
			Arc::new(MediaHandler::new(media_storage(settings))),
		)?;
	}
	Ok(router)
}
