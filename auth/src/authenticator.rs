use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Serialize;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Credential coordinator: password hashing plus session token minting.
///
/// Owns the token lifetime so every token it mints expires the same fixed
/// duration after issuance.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    jwt_handler: JwtHandler,
    token_ttl: Duration,
}

/// Subject and issue instant recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    pub issued_at: DateTime<Utc>,
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    /// * `token_ttl` - Lifetime of issued tokens
    pub fn new(jwt_secret: &[u8], token_ttl: Duration) -> Self {
        Self::with_hasher(jwt_secret, token_ttl, PasswordHasher::new())
    }

    /// Create an authenticator with a specific password hasher.
    pub fn with_hasher(jwt_secret: &[u8], token_ttl: Duration, password_hasher: PasswordHasher) -> Self {
        Self {
            password_hasher,
            jwt_handler: JwtHandler::new(jwt_secret),
            token_ttl,
        }
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// # Errors
    /// * `PasswordError` - Stored hash could not be parsed
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Issue a signed token for a subject, valid for the configured lifetime.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token signing failed
    pub fn issue_token(&self, subject: impl ToString) -> Result<String, JwtError> {
        let claims = Claims::for_subject(subject, self.token_ttl);
        self.jwt_handler.encode(&claims)
    }

    /// Verify a token and return its subject and issue instant.
    ///
    /// # Errors
    /// * `TokenExpired` - Token lifetime elapsed
    /// * `InvalidToken` - Bad signature or malformed token
    pub fn verify_token(&self, token: &str) -> Result<VerifiedToken, JwtError> {
        let claims: Claims = self.jwt_handler.decode(token)?;

        Ok(VerifiedToken {
            issued_at: claims.issued_at(),
            subject: claims.sub,
        })
    }

    /// Encode arbitrary claims with the authenticator's key.
    ///
    /// Useful when the caller needs control over `iat`/`exp`.
    pub fn generate_token<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        self.jwt_handler.encode(claims)
    }
}
