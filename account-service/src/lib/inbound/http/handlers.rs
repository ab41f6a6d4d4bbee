use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::domain::user::models::User;
use crate::domain::user::session::Session;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

pub mod forgot_password;
pub mod health;
pub mod login;
pub mod me;
pub mod reset_password;
pub mod signup;
pub mod update_password;
pub mod users;

/// Successful response: status code, extra headers and the JSON envelope.
#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize> {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<ApiResponseBody<T>>,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Some(ApiResponseBody::new(Some(data))),
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        if let Some(body) = self.body.as_mut() {
            body.token = Some(token);
        }
        self
    }

    pub fn with_results(mut self, results: usize) -> Self {
        if let Some(body) = self.body.as_mut() {
            body.results = Some(results);
        }
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl ApiSuccess<()> {
    /// `{status: "success"}` with no data.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Some(ApiResponseBody::new(None)),
        }
    }

    /// `{status: "success", message}` with no data.
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        let mut body = ApiResponseBody::new(None);
        body.message = Some(message.into());
        Self {
            status,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// 204 without a body.
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, self.headers, Json(body)).into_response(),
            None => (self.status, self.headers).into_response(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> ApiResponseBody<T> {
    fn new(data: Option<T>) -> Self {
        Self {
            status: "success",
            token: None,
            results: None,
            message: None,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        };

        let status_label = if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", message);
            "error"
        } else {
            "fail"
        };

        (
            status,
            Json(ApiErrorBody {
                status: status_label,
                message,
            }),
        )
            .into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        if err.is_validation() {
            return ApiError::BadRequest(err.to_string());
        }

        match err {
            UserError::Unauthenticated(_) | UserError::InvalidCredentials => {
                ApiError::Unauthorized(err.to_string())
            }
            UserError::Forbidden => ApiError::Forbidden(err.to_string()),
            UserError::InvalidOrExpiredToken => ApiError::BadRequest(err.to_string()),
            UserError::NotFound(msg) => ApiError::NotFound(msg),
            UserError::EmailAlreadyExists(_) => ApiError::Conflict(err.to_string()),
            UserError::EmailDelivery(_) => ApiError::InternalServerError(err.to_string()),
            UserError::Password(_)
            | UserError::Token(_)
            | UserError::DatabaseError(_)
            | UserError::Unknown(_) => {
                tracing::error!("Internal failure: {}", err);
                ApiError::InternalServerError("Something went very wrong!".to_string())
            }
            // Validation variants are handled above.
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    pub status: &'static str,
    pub message: String,
}

/// Public view of an account. Never carries credentials or reset state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.as_str().to_string(),
            email: user.email.as_str().to_string(),
            role: user.role.as_str().to_string(),
            active: user.active,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

/// `data: { user }`, used by session and profile responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEnvelope {
    pub user: UserData,
}

/// `data: { data }`, used by the generic CRUD responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentEnvelope<T: Serialize> {
    pub data: T,
}

/// Build the session response: token in the body, mirrored into the cookie.
pub(crate) fn session_response(
    state: &AppState,
    status: StatusCode,
    session: Session,
) -> Result<ApiSuccess<UserEnvelope>, ApiError> {
    let cookie = state
        .session_cookie
        .issue(&session.token)
        .map_err(|e| ApiError::InternalServerError(format!("Invalid session cookie: {}", e)))?;

    Ok(ApiSuccess::new(
        status,
        UserEnvelope {
            user: UserData::from(&session.user),
        },
    )
    .with_token(session.token)
    .with_header(SET_COOKIE, cookie))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::EmailDeliveryError;
    use crate::user::errors::AuthFailure;
    use crate::user::errors::PasswordPolicyError;

    #[test]
    fn test_user_error_status_mapping() {
        let cases = [
            (
                UserError::InvalidPassword(PasswordPolicyError::Mismatch),
                StatusCode::BAD_REQUEST,
            ),
            (UserError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                UserError::Unauthenticated(AuthFailure::PasswordChanged),
                StatusCode::UNAUTHORIZED,
            ),
            (UserError::Forbidden, StatusCode::FORBIDDEN),
            (UserError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (UserError::InvalidOrExpiredToken, StatusCode::BAD_REQUEST),
            (UserError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (UserError::EmailAlreadyExists("x".into()), StatusCode::CONFLICT),
            (
                UserError::EmailDelivery(EmailDeliveryError::Unavailable("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                UserError::DatabaseError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = ApiError::from(UserError::DatabaseError("connection refused".into()));
        assert_eq!(
            err,
            ApiError::InternalServerError("Something went very wrong!".to_string())
        );
    }

    #[test]
    fn test_envelope_skips_absent_fields() {
        let body = serde_json::to_value(ApiResponseBody::<()>::new(None)).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "success" }));
    }
}
