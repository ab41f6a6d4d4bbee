use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::DocumentEnvelope;
use super::UserData;
use crate::domain::crud::models::ListQuery;
use crate::domain::crud::models::Resource;
use crate::domain::crud::ports::CrudPort;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserName;
use crate::domain::user::models::UserPatch;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// Paging and sorting parameters of `GET /users`.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    page: Option<u32>,
    limit: Option<u32>,
    sort: Option<String>,
}

/// HTTP request body for admin updates (raw JSON)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequestBody {
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
    active: Option<bool>,
    password: Option<serde_json::Value>,
    password_confirm: Option<serde_json::Value>,
}

impl UpdateUserRequestBody {
    fn try_into_patch(self) -> Result<UserPatch, UserError> {
        if self.password.is_some() || self.password_confirm.is_some() {
            return Err(UserError::Validation(
                "Passwords cannot be changed through this route.".into(),
            ));
        }

        let patch = UserPatch {
            name: self.name.map(UserName::new).transpose()?,
            email: self.email.map(EmailAddress::new).transpose()?,
            role: self.role.map(|r| r.parse::<Role>()).transpose()?,
            active: self.active,
        };
        if patch.is_empty() {
            return Err(UserError::Validation(
                "Please provide at least one field to update.".into(),
            ));
        }
        Ok(patch)
    }
}

pub async fn get_all_users(
    State(state): State<AppState>,
    Query(params): Query<ListUsersParams>,
) -> Result<ApiSuccess<DocumentEnvelope<Vec<UserData>>>, ApiError> {
    let query = ListQuery::parse(
        params.page,
        params.limit,
        params.sort.as_deref(),
        User::SORTABLE,
    )?;

    let users = state.users.get_all(query).await?;
    let data: Vec<UserData> = users.iter().map(UserData::from).collect();
    let results = data.len();

    Ok(ApiSuccess::new(StatusCode::OK, DocumentEnvelope { data }).with_results(results))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<ApiSuccess<DocumentEnvelope<UserData>>, ApiError> {
    let user_id = UserId::from_string(&user_id).map_err(UserError::from)?;

    let user = state.users.get_one(&user_id).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        DocumentEnvelope {
            data: UserData::from(&user),
        },
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<UpdateUserRequestBody>,
) -> Result<ApiSuccess<DocumentEnvelope<UserData>>, ApiError> {
    let user_id = UserId::from_string(&user_id).map_err(UserError::from)?;
    let patch = body.try_into_patch()?;

    let user = state.users.update_one(&user_id, patch).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        DocumentEnvelope {
            data: UserData::from(&user),
        },
    ))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<ApiSuccess<()>, ApiError> {
    let user_id = UserId::from_string(&user_id).map_err(UserError::from)?;

    state.users.delete_one(&user_id).await?;

    Ok(ApiSuccess::no_content())
}

/// Accounts are only created through `/signup`.
pub async fn create_user() -> Result<ApiSuccess<()>, ApiError> {
    Err(ApiError::InternalServerError(
        "This route is not defined! Please use /signup instead.".to_string(),
    ))
}
