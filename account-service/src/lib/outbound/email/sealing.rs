//! At-rest encryption for queued email bodies.
//!
//! Reset links carry a live secret, so the outbox stores bodies sealed with
//! ChaCha20-Poly1305. The row id is bound as associated data: a sealed body
//! copied onto another row does not open.

use base64::engine::general_purpose::STANDARD;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::aead::KeyInit;
use chacha20poly1305::aead::Payload;
use chacha20poly1305::ChaCha20Poly1305;
use chacha20poly1305::Key;
use chacha20poly1305::Nonce;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use uuid::Uuid;

pub const OUTBOX_KEY_BYTES: usize = 32;
const NONCE_BYTES: usize = 12;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SealingError {
    #[error("Outbox key must be base64 of {OUTBOX_KEY_BYTES} bytes")]
    InvalidKey,

    #[error("Failed to seal email body")]
    Seal,

    #[error("Sealed email body could not be opened")]
    Open,
}

#[derive(Clone)]
pub struct OutboxCipher {
    cipher: ChaCha20Poly1305,
}

impl OutboxCipher {
    pub fn new(key: &[u8; OUTBOX_KEY_BYTES]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Build a cipher from the standard-base64 key found in configuration.
    ///
    /// # Errors
    /// * `InvalidKey` - Not base64, or not exactly 32 bytes once decoded
    pub fn from_base64(encoded: &str) -> Result<Self, SealingError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| SealingError::InvalidKey)?;
        let key: [u8; OUTBOX_KEY_BYTES] =
            bytes.try_into().map_err(|_| SealingError::InvalidKey)?;
        Ok(Self::new(&key))
    }

    /// Encrypt `plaintext` for the outbox row `id`.
    ///
    /// Returns URL-safe base64 of `nonce (12 bytes) || ciphertext`.
    pub fn seal(&self, id: Uuid, plaintext: &str) -> Result<String, SealingError> {
        let mut nonce_bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce_bytes);

        let aad = associated_data(id);
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &aad,
                },
            )
            .map_err(|_| SealingError::Seal)?;

        let mut sealed = Vec::with_capacity(NONCE_BYTES + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Decrypt a body sealed for the outbox row `id`.
    ///
    /// # Errors
    /// * `Open` - Malformed input, wrong key, wrong row id or tampered data
    pub fn open(&self, id: Uuid, sealed: &str) -> Result<String, SealingError> {
        let data = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|_| SealingError::Open)?;
        if data.len() < NONCE_BYTES {
            return Err(SealingError::Open);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_BYTES);
        let aad = associated_data(id);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| SealingError::Open)?;

        String::from_utf8(plaintext).map_err(|_| SealingError::Open)
    }
}

fn associated_data(id: Uuid) -> Vec<u8> {
    format!("email-outbox:v1|{id}").into_bytes()
}
