use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::user::access;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::cookie::extract_token;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;

/// Identity resolved by [`authenticate`], read by handlers via
/// `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Middleware that resolves the request's bearer token to a live user and
/// adds it to request extensions
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers());

    let user = state.account_service.authenticate(token.as_deref()).await?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Middleware admitting only identities whose role is in `allowed`.
///
/// Must be layered inside [`authenticate`]; without a resolved identity it
/// rejects the request.
pub async fn restrict_to(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let current = req.extensions().get::<CurrentUser>();
    access::restrict_to(current.map(|c| &c.0), allowed)?;

    Ok(next.run(req).await)
}
