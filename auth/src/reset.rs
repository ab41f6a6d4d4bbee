//! One-time password reset secrets.
//!
//! The plaintext secret only ever leaves the process inside the reset email;
//! storage keeps the SHA-256 digest and lookups re-digest the presented value.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

/// Number of random bytes behind each secret (256 bits).
pub const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Error)]
pub enum ResetTokenError {
    #[error("Failed to generate reset token: {0}")]
    GenerationFailed(String),
}

/// Freshly generated reset secret together with its digest.
pub struct ResetToken {
    secret: String,
    digest: String,
}

impl ResetToken {
    /// Generate a new secret from the operating system RNG.
    ///
    /// # Errors
    /// * `GenerationFailed` - The OS RNG could not provide entropy
    pub fn generate() -> Result<Self, ResetTokenError> {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| ResetTokenError::GenerationFailed(e.to_string()))?;

        let secret = URL_SAFE_NO_PAD.encode(bytes);
        let digest = digest_secret(&secret);
        Ok(Self { secret, digest })
    }

    /// Plaintext secret to embed in the reset link.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Digest to persist on the account.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl std::fmt::Debug for ResetToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetToken")
            .field("secret", &"<redacted>")
            .field("digest", &self.digest)
            .finish()
    }
}

/// Lower-case hex SHA-256 digest of a presented secret.
pub fn digest_secret(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}
