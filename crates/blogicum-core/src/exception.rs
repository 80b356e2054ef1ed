//! Error type for request processing.
//!
//! Every handler returns [`Result<Response>`](Result). Errors that escape a
//! handler are turned into error pages by the project's root handler, using
//! [`Error::status_code`] to pick the page.

use hyper::StatusCode;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Permission denied: {0}")]
	PermissionDenied(String),
	#[error("CSRF verification failed: {0}")]
	CsrfFailure(String),
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Authentication error: {0}")]
	Authentication(String),
	#[error("Bad request: {0}")]
	BadRequest(String),
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("Migration error: {0}")]
	Migration(#[from] sqlx::migrate::MigrateError),
	#[error("Template error: {0}")]
	Template(#[from] tera::Error),
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Internal error: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	/// HTTP status that best describes this error.
	///
	/// # Examples
	///
	/// ```
	/// use blogicum_core::Error;
	/// use hyper::StatusCode;
	///
	/// let err = Error::NotFound("post 42".to_string());
	/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
	/// ```
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::NotFound(_) => StatusCode::NOT_FOUND,
			Error::PermissionDenied(_) | Error::CsrfFailure(_) => StatusCode::FORBIDDEN,
			Error::Validation(_) | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
			Error::Authentication(_) => StatusCode::UNAUTHORIZED,
			Error::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Whether the error was caused by the client rather than the server.
	pub fn is_client_error(&self) -> bool {
		self.status_code().is_client_error()
	}
}

impl From<&str> for Error {
	fn from(msg: &str) -> Self {
		Error::Internal(msg.to_string())
	}
}

impl From<String> for Error {
	fn from(msg: String) -> Self {
		Error::Internal(msg)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Error::NotFound("x".into()), StatusCode::NOT_FOUND)]
	#[case(Error::PermissionDenied("x".into()), StatusCode::FORBIDDEN)]
	#[case(Error::CsrfFailure("x".into()), StatusCode::FORBIDDEN)]
	#[case(Error::Validation("x".into()), StatusCode::BAD_REQUEST)]
	#[case(Error::Database(sqlx::Error::RowNotFound), StatusCode::NOT_FOUND)]
	#[case(Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
	fn test_status_code_mapping(#[case] error: Error, #[case] expected: StatusCode) {
		assert_eq!(error.status_code(), expected);
	}

	#[rstest]
	fn test_client_error_classification() {
		assert!(Error::NotFound("post".into()).is_client_error());
		assert!(!Error::Internal("boom".into()).is_client_error());
	}
}
