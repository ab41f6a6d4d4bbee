use axum::http::header::AUTHORIZATION;
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use http::header::InvalidHeaderValue;

/// Name of the cookie mirroring the bearer token.
pub const SESSION_COOKIE_NAME: &str = "jwt";

/// How the session cookie is written.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookie {
    pub max_age_days: i64,
    /// Only set in production, where the service sits behind HTTPS.
    pub secure: bool,
}

impl SessionCookie {
    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn issue(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let max_age = self.max_age_days * 24 * 60 * 60;
        self.build(&format!(
            "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
        ))
    }

    /// `Set-Cookie` value overwriting the token so the browser drops it.
    pub fn clear(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(&format!(
            "{SESSION_COOKIE_NAME}=loggedout; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        ))
    }

    fn build(&self, cookie: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = cookie.to_string();
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Token presented by the request: `Authorization: Bearer` first, then the
/// session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer_token(headers).or_else(|| extract_cookie_token(headers))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.trim().strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| key.trim() == SESSION_COOKIE_NAME && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}
