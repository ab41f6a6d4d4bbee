use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::session_response;
use super::ApiError;
use super::ApiSuccess;
use super::UserEnvelope;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewPassword;
use crate::domain::user::models::SignupCommand;
use crate::domain::user::models::UserName;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// HTTP request body for signing up (raw JSON)
///
/// Unknown fields such as `role` are ignored; every new account starts as
/// a plain user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequestBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

impl SignupRequestBody {
    fn try_into_command(self) -> Result<SignupCommand, UserError> {
        let name = UserName::new(self.name.unwrap_or_default())?;
        let email = EmailAddress::new(self.email.unwrap_or_default())?;
        let password = NewPassword::new(self.password, self.password_confirm)?;

        Ok(SignupCommand {
            name,
            email,
            password,
        })
    }
}

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequestBody>,
) -> Result<ApiSuccess<UserEnvelope>, ApiError> {
    let command = body.try_into_command()?;

    let session = state.account_service.signup(command).await?;

    session_response(&state, StatusCode::CREATED, session)
}
