use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::session_response;
use super::ApiError;
use super::ApiSuccess;
use super::UserEnvelope;
use crate::domain::user::models::NewPassword;
use crate::domain::user::models::ResetPasswordCommand;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequestBody {
    password: Option<String>,
    password_confirm: Option<String>,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordRequestBody>,
) -> Result<ApiSuccess<UserEnvelope>, ApiError> {
    let new_password =
        NewPassword::new(body.password, body.password_confirm).map_err(UserError::from)?;

    let session = state
        .account_service
        .reset_password(ResetPasswordCommand {
            secret: token,
            new_password,
        })
        .await?;

    session_response(&state, StatusCode::CREATED, session)
}
