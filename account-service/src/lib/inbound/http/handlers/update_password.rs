use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::session_response;
use super::ApiError;
use super::ApiSuccess;
use super::UserEnvelope;
use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::NewPassword;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequestBody {
    password_current: Option<String>,
    password: Option<String>,
    password_confirm: Option<String>,
}

impl UpdatePasswordRequestBody {
    fn try_into_command(self) -> Result<ChangePasswordCommand, UserError> {
        let current_password = self
            .password_current
            .filter(|p| !p.is_empty())
            .ok_or_else(|| UserError::Validation("Please provide your current password".into()))?;
        let new_password = NewPassword::new(self.password, self.password_confirm)?;

        Ok(ChangePasswordCommand {
            current_password,
            new_password,
        })
    }
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<UpdatePasswordRequestBody>,
) -> Result<ApiSuccess<UserEnvelope>, ApiError> {
    let command = body.try_into_command()?;

    let session = state.account_service.update_password(&user, command).await?;

    session_response(&state, StatusCode::OK, session)
}
