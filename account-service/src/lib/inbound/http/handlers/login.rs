use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::session_response;
use super::ApiError;
use super::ApiSuccess;
use super::UserEnvelope;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    email: Option<String>,
    password: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequestBody>,
) -> Result<ApiSuccess<UserEnvelope>, ApiError> {
    let command = LoginCommand::new(body.email, body.password).map_err(UserError::Validation)?;

    let session = state.account_service.login(command).await?;

    session_response(&state, StatusCode::OK, session)
}

/// Overwrite the session cookie. Bearer tokens stay valid until they expire.
pub async fn logout(State(state): State<AppState>) -> Result<ApiSuccess<()>, ApiError> {
    let cookie = state
        .session_cookie
        .clear()
        .map_err(|e| ApiError::InternalServerError(format!("Invalid session cookie: {}", e)))?;

    Ok(ApiSuccess::empty(StatusCode::OK).with_header(SET_COOKIE, cookie))
}
