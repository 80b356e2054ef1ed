//! Password hashing.

use argon2::Argon2;
use argon2::password_hash::{
	PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use blogicum_core::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Password hasher trait
///
/// Implement this trait to plug in another hashing algorithm.
pub trait PasswordHasher: Send + Sync {
	/// Hashes a plaintext password into a self-describing string.
	fn hash(&self, password: &str) -> Result<String>;

	/// `Ok(false)` on mismatch, `Err` only when the stored hash is unreadable.
	fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id password hasher producing PHC strings.
///
/// ```
/// use blogicum_auth::{Argon2Hasher, PasswordHasher};
///
/// let hasher = Argon2Hasher::new();
/// let hash = hasher.hash("correct horse").unwrap();
///
/// assert!(hash.starts_with("$argon2id$"));
/// assert!(hasher.verify("correct horse", &hash).unwrap());
/// assert!(!hasher.verify("battery staple", &hash).unwrap());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
	pub fn new() -> Self {
		Self
	}
}

impl PasswordHasher for Argon2Hasher {
	fn hash(&self, password: &str) -> Result<String> {
		let mut salt_bytes = [0u8; 16];
		rand::thread_rng().fill_bytes(&mut salt_bytes);

		let salt = SaltString::encode_b64(&salt_bytes)
			.map_err(|e| Error::Authentication(e.to_string()))?;

		Argon2::default()
			.hash_password(password.as_bytes(), &salt)
			.map(|hash| hash.to_string())
			.map_err(|e| Error::Authentication(e.to_string()))
	}

	fn verify(&self, password: &str, hash: &str) -> Result<bool> {
		let parsed_hash =
			PasswordHash::new(hash).map_err(|e| Error::Authentication(e.to_string()))?;

		Ok(Argon2::default()
			.verify_password(password.as_bytes(), &parsed_hash)
			.is_ok())
	}
}

/// Hashes `password` on the blocking thread pool.
pub async fn hash_password(hasher: Arc<dyn PasswordHasher>, password: String) -> Result<String> {
	tokio::task::spawn_blocking(move || hasher.hash(&password))
		.await
		.map_err(|e| Error::Internal(format!("password hashing task failed: {}", e)))?
}

/// Verifies `password` against `hash` on the blocking thread pool.
pub async fn verify_password(
	hasher: Arc<dyn PasswordHasher>,
	password: String,
	hash: String,
) -> Result<bool> {
	tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
		.await
		.map_err(|e| Error::Internal(format!("password verification task failed: {}", e)))?
}

/// Random ASCII letters and digits, used for session keys and CSRF tokens.
pub fn get_random_string(length: usize) -> String {
	rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(length)
		.map(char::from)
		.collect()
}

/// Compares two strings in constant time. Only the length may leak.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
	a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_hashes_are_salted() {
		// Arrange
		let hasher = Argon2Hasher::new();

		// Act
		let first = hasher.hash("password123").unwrap();
		let second = hasher.hash("password123").unwrap();

		// Assert
		assert_ne!(first, second);
		assert!(hasher.verify("password123", &first).unwrap());
		assert!(hasher.verify("password123", &second).unwrap());
	}

	#[rstest]
	fn test_verify_rejects_garbage_hash() {
		let hasher = Argon2Hasher::new();
		assert!(hasher.verify("x", "not-a-phc-string").is_err());
	}

	#[rstest]
	fn test_random_string() {
		let s = get_random_string(32);
		assert_eq!(s.len(), 32);
		assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(s, get_random_string(32));
	}

	#[rstest]
	#[tokio::test]
	async fn test_blocking_pool_helpers() {
		// Arrange
		let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new());

		// Act
		let hash = hash_password(hasher.clone(), "password123".to_string()).await.unwrap();

		// Assert
		assert!(verify_password(hasher.clone(), "password123".to_string(), hash.clone()).await.unwrap());
		assert!(!verify_password(hasher.clone(), "wrong".to_string(), hash).await.unwrap());
		assert!(verify_password(hasher, "x".to_string(), "not a hash".to_string()).await.is_err());
	}

	#[rstest]
	#[case("abc", "abc", true)]
	#[case("abc", "abd", false)]
	#[case("abc", "ab", false)]
	#[case("", "", true)]
	#[case("токен", "токен", true)]
	fn test_constant_time_eq(#[case] a: &str, #[case] b: &str, #[case] expected: bool) {
		assert_eq!(constant_time_eq(a, b), expected);
	}
}
