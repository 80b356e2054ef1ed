//! Authentication pieces for Blogicum.
//!
//! - [`hasher`]: Argon2id password hashing and random token helpers
//! - [`session`]: the `sessions` table backend and the per-request [`Session`]
//! - [`middleware`]: [`SessionMiddleware`], which loads and saves sessions
//! - [`csrf`]: double-submit cookie protection for unsafe methods
//! - [`authentication`]: [`CurrentUser`] resolution plus `login`/`logout`
//!
//! Middleware order matters: sessions first, then CSRF and authentication.

pub mod authentication;
pub mod csrf;
pub mod hasher;
pub mod middleware;
pub mod session;

pub use authentication::{AuthUser, AuthenticationMiddleware, CurrentUser, UserBackend, login, logout};
pub use csrf::{CsrfMiddleware, CsrfToken};
pub use hasher::{Argon2Hasher, PasswordHasher, hash_password, verify_password};
pub use middleware::{SessionConfig, SessionMiddleware};
pub use session::{DatabaseSessionBackend, Session, SessionBackend};
