use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::Response;
use axum::middleware;
use axum::middleware::Next;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::cookie::SessionCookie;
use super::handlers::forgot_password::forgot_password;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::login::logout;
use super::handlers::me::delete_me;
use super::handlers::me::get_me;
use super::handlers::me::update_me;
use super::handlers::reset_password::reset_password;
use super::handlers::signup::signup;
use super::handlers::update_password::update_password;
use super::handlers::users::create_user;
use super::handlers::users::delete_user;
use super::handlers::users::get_all_users;
use super::handlers::users::get_user;
use super::handlers::users::update_user;
use super::middleware::authenticate as auth_middleware;
use super::middleware::restrict_to;
use crate::domain::crud::ports::CrudPort;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::ports::AccountServicePort;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<dyn AccountServicePort>,
    pub users: Arc<dyn CrudPort<User>>,
    pub session_cookie: SessionCookie,
}

pub fn create_router(
    account_service: Arc<dyn AccountServicePort>,
    users: Arc<dyn CrudPort<User>>,
    session_cookie: SessionCookie,
) -> Router {
    let state = AppState {
        account_service,
        users,
        session_cookie,
    };

    let public_routes = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/forgotPassword", post(forgot_password))
        .route("/resetPassword/:token", patch(reset_password));

    let protected_routes = Router::new()
        .route("/updateMyPassword", patch(update_password))
        .route("/me", get(get_me))
        .route("/updateMe", patch(update_me))
        .route("/deleteMe", delete(delete_me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Layers run bottom-up: authentication resolves the identity before the
    // role check reads it.
    let admin_routes = Router::new()
        .route("/", get(get_all_users).post(create_user))
        .route(
            "/:user_id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            restrict_to(ADMIN_ONLY, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    let users_api = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/users", users_api)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
