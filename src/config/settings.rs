//! Project settings.
//!
//! Settings are assembled from layered sources, lowest priority first:
//!
//! 1. built-in defaults ([`Settings::default`])
//! 2. a TOML file (`BLOGICUM_SETTINGS_FILE`, or `blogicum.toml` when present)
//! 3. environment variables prefixed with `BLOGICUM_`
//!
//! Keys are the lowercase field names, so `BLOGICUM_POSTS_PER_PAGE=5` and
//! `posts_per_page = 5` in the file set the same value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "BLOGICUM_";
pub const SETTINGS_FILE_ENV: &str = "BLOGICUM_SETTINGS_FILE";
pub const DEFAULT_SETTINGS_FILE: &str = "blogicum.toml";

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid setting value: {0}")]
	Deserialize(#[from] serde_json::Error),

	#[error("Invalid configuration: {0}")]
	Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub debug: bool,
	pub database_url: String,
	pub bind_address: String,
	pub media_root: PathBuf,
	pub media_url: String,
	/// Serve uploaded files from `media_url`. Production setups usually
	/// leave that to a front web server.
	pub serve_media: bool,
	pub max_upload_size: usize,
	/// Cap on a whole request body, uploads included. Larger requests get
	/// 413 from the server.
	pub max_request_size: usize,
	pub posts_per_page: usize,
	pub login_url: String,
	/// Session lifetime in seconds.
	pub session_cookie_age: i64,
	pub session_cookie_secure: bool,
	pub csrf_cookie_secure: bool,
	pub log_level: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			debug: false,
			database_url: "sqlite://db.sqlite3?mode=rwc".to_string(),
			bind_address: "127.0.0.1:8000".to_string(),
			media_root: PathBuf::from("media"),
			media_url: "/media/".to_string(),
			serve_media: true,
			max_upload_size: 10 * 1024 * 1024,
			max_request_size: 12 * 1024 * 1024,
			posts_per_page: 10,
			login_url: "/auth/login/".to_string(),
			session_cookie_age: 60 * 60 * 24 * 14,
			session_cookie_secure: false,
			csrf_cookie_secure: false,
			log_level: "info".to_string(),
		}
	}
}

/// One layer of configuration values.
pub trait ConfigSource {
	fn load(&self) -> Result<Map<String, Value>, SettingsError>;

	fn description(&self) -> String;
}

pub struct DefaultSource;

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<Map<String, Value>, SettingsError> {
		match serde_json::to_value(Settings::default())? {
			Value::Object(map) => Ok(map),
			_ => Err(SettingsError::Invalid("defaults are not a table".to_string())),
		}
	}

	fn description(&self) -> String {
		"Built-in defaults".to_string()
	}
}

/// TOML file source. A missing file contributes nothing.
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<Map<String, Value>, SettingsError> {
		if !self.path.exists() {
			return Ok(Map::new());
		}
		let content = fs::read_to_string(&self.path)?;
		let table: toml::Table = toml::from_str(&content)?;
		match serde_json::to_value(table)? {
			Value::Object(map) => Ok(map),
			_ => Err(SettingsError::Invalid(format!(
				"{}: expected a table at the root",
				self.path.display()
			))),
		}
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Environment variables with a prefix, e.g. `BLOGICUM_DEBUG=1`.
pub struct EnvSource {
	prefix: String,
	vars: Vec<(String, String)>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn new(prefix: impl Into<String>) -> Self {
		Self::from_vars(prefix, std::env::vars())
	}

	/// Uses the given variables instead of the process environment.
	pub fn from_vars(prefix: impl Into<String>, vars: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			prefix: prefix.into(),
			vars: vars.into_iter().collect(),
		}
	}

	fn parse_value(key: &str, raw: &str) -> Value {
		let is_bool = matches!(
			key,
			"debug" | "serve_media" | "session_cookie_secure" | "csrf_cookie_secure"
		);
		if is_bool {
			return match raw.trim().to_lowercase().as_str() {
				"true" | "1" | "yes" | "on" => Value::Bool(true),
				"false" | "0" | "no" | "off" | "" => Value::Bool(false),
				_ => Value::String(raw.to_string()),
			};
		}
		let is_number = matches!(
			key,
			"posts_per_page" | "session_cookie_age" | "max_upload_size" | "max_request_size"
		);
		if is_number {
			if let Ok(n) = raw.trim().parse::<i64>() {
				return Value::from(n);
			}
		}
		Value::String(raw.to_string())
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<Map<String, Value>, SettingsError> {
		let mut map = Map::new();
		for (key, value) in &self.vars {
			let Some(stripped) = key.strip_prefix(&self.prefix) else {
				continue;
			};
			let key = stripped.to_lowercase();
			if key == "settings_file" {
				continue;
			}
			map.insert(key.clone(), Self::parse_value(&key, value));
		}
		Ok(map)
	}

	fn description(&self) -> String {
		format!("Environment variables (prefix: {})", self.prefix)
	}
}

impl Settings {
	/// Loads settings from defaults, the settings file and the environment.
	pub fn load() -> Result<Self, SettingsError> {
		let file = std::env::var(SETTINGS_FILE_ENV)
			.map(PathBuf::from)
			.unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_FILE));
		Self::from_sources(&[
			&DefaultSource,
			&TomlFileSource::new(file),
			&EnvSource::new(ENV_PREFIX),
		])
	}

	/// Merges `sources` in order (later ones win) and validates the result.
	/// Unknown keys are ignored.
	pub fn from_sources(sources: &[&dyn ConfigSource]) -> Result<Self, SettingsError> {
		let mut merged = Map::new();
		for source in sources {
			let layer = source.load()?;
			tracing::debug!(source = %source.description(), keys = layer.len(), "loaded settings layer");
			merged.extend(layer);
		}
		let settings: Settings = serde_json::from_value(Value::Object(merged))?;
		settings.validate()?;
		Ok(settings)
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.posts_per_page == 0 {
			return Err(SettingsError::Invalid(
				"posts_per_page must be at least 1".to_string(),
			));
		}
		if self.database_url.trim().is_empty() {
			return Err(SettingsError::Invalid(
				"database_url must not be empty".to_string(),
			));
		}
		if self.max_request_size < self.max_upload_size {
			return Err(SettingsError::Invalid(format!(
				"max_request_size ({}) must not be smaller than max_upload_size ({})",
				self.max_request_size, self.max_upload_size
			)));
		}
		if self.session_cookie_age <= 0 {
			return Err(SettingsError::Invalid(
				"session_cookie_age must be positive".to_string(),
			));
		}
		if !self.login_url.starts_with('/') {
			return Err(SettingsError::Invalid(format!(
				"login_url must be a local path, got {:?}",
				self.login_url
			)));
		}
		if !self.media_url.starts_with('/') || !self.media_url.ends_with('/') {
			return Err(SettingsError::Invalid(format!(
				"media_url must start and end with '/', got {:?}",
				self.media_url
			)));
		}
		Ok(())
	}
}
