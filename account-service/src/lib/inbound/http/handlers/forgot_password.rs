use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::router::AppState;
use crate::user::errors::EmailError;
use crate::user::errors::UserError;

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequestBody {
    email: Option<String>,
}

/// Start a password reset.
///
/// Answers the same way whether a link was sent or an unknown address was
/// concealed.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequestBody>,
) -> Result<ApiSuccess<()>, ApiError> {
    let email = body
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or(UserError::InvalidEmail(EmailError::Missing))?;

    state.account_service.forgot_password(&email).await?;

    Ok(ApiSuccess::message(StatusCode::OK, "Token sent to email!"))
}
