use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::DocumentEnvelope;
use super::UserData;
use super::UserEnvelope;
use crate::domain::crud::ports::CrudPort;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::UserName;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// HTTP request body for profile updates.
///
/// Only `name` and `email` are applied; password fields are accepted here
/// solely to reject them with a pointer to `/updateMyPassword`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequestBody {
    name: Option<String>,
    email: Option<String>,
    password: Option<serde_json::Value>,
    password_confirm: Option<serde_json::Value>,
}

impl UpdateMeRequestBody {
    fn try_into_command(self) -> Result<UpdateProfileCommand, UserError> {
        if self.password.is_some() || self.password_confirm.is_some() {
            return Err(UserError::Validation(
                "This route is not for password updates. Please use /updateMyPassword.".into(),
            ));
        }

        Ok(UpdateProfileCommand {
            name: self.name.map(UserName::new).transpose()?,
            email: self.email.map(EmailAddress::new).transpose()?,
        })
    }
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<ApiSuccess<DocumentEnvelope<UserData>>, ApiError> {
    let user = state.users.get_one(&user.id).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        DocumentEnvelope {
            data: UserData::from(&user),
        },
    ))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<UpdateMeRequestBody>,
) -> Result<ApiSuccess<UserEnvelope>, ApiError> {
    let command = body.try_into_command()?;

    let updated = state.account_service.update_me(&user, command).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        UserEnvelope {
            user: UserData::from(&updated),
        },
    ))
}

pub async fn delete_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<ApiSuccess<()>, ApiError> {
    state.account_service.deactivate(&user).await?;

    Ok(ApiSuccess::no_content())
}
