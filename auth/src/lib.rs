//! Authentication utilities library
//!
//! Provides the credential primitives used by the account service:
//! - Password hashing (Argon2id)
//! - Signed, time-boxed bearer tokens (JWT, HS256)
//! - One-time password reset secrets (random secret + SHA-256 digest)
//! - Token issuing and verification through one coordinator
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Issuing and verifying tokens
//! ```
//! use auth::Authenticator;
//! use chrono::Duration;
//!
//! let auth = Authenticator::new(b"secret_key_at_least_32_bytes_long!", Duration::hours(1));
//!
//! let token = auth.issue_token("user123").unwrap();
//! let verified = auth.verify_token(&token).unwrap();
//! assert_eq!(verified.subject, "user123");
//! ```
//!
//! ## Reset secrets
//! ```
//! use auth::reset::{digest_secret, ResetToken};
//!
//! let token = ResetToken::generate().unwrap();
//! assert_eq!(token.digest(), digest_secret(token.secret()));
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod reset;

// Re-export commonly used items
pub use authenticator::Authenticator;
pub use authenticator::VerifiedToken;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use reset::ResetToken;
pub use reset::ResetTokenError;
