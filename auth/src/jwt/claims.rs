use chrono::DateTime;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Session token payload.
///
/// Standard RFC 7519 claims plus `iat_ms`, the issue instant in milliseconds.
/// `iat` alone only has second resolution, which is too coarse to order a
/// token against a password change made in the same second.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (account identifier)
    pub sub: String,

    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,

    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,

    /// Issued at (Unix timestamp, milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat_ms: Option<i64>,
}

impl Claims {
    /// Create claims for a subject, issued now and valid for `ttl`.
    ///
    /// # Arguments
    /// * `subject` - Account identifier
    /// * `ttl` - Lifetime of the token
    ///
    /// # Returns
    /// Claims with sub, iat, iat_ms and exp set
    pub fn for_subject(subject: impl ToString, ttl: Duration) -> Self {
        Self::issued_at_instant(subject, Utc::now(), ttl)
    }

    /// Create claims for a subject with an explicit issue instant.
    pub fn issued_at_instant(subject: impl ToString, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let expiration = issued_at + ttl;

        Self {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
            iat_ms: Some(issued_at.timestamp_millis()),
        }
    }

    /// Instant the token was minted.
    ///
    /// Uses `iat_ms` when present and falls back to the whole-second `iat`.
    pub fn issued_at(&self) -> DateTime<Utc> {
        let millis = self.iat_ms.unwrap_or(self.iat.saturating_mul(1000));
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
