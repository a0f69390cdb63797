//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: registration, login, the current account and
//! token refresh.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::forum::users::{LoginRequest, RegisterRequest};
use crate::forum::views::{AuthResponse, UserView};
use crate::web::state::AppState;

/// POST /api/auth/register - Create a new account and sign it in
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid username, email or password"),
        (status = 409, description = "Username or email already in use")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.forum.users.register(req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/auth/login - Login with a username or email
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.forum.users.login(req).await?))
}

/// GET /api/auth/me - The signed-in account
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current account", body = UserView),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.forum.users.me(&auth).await?))
}

/// POST /api/auth/refresh-token - Reissue a token with the current role
#[utoipa::path(
    post,
    path = "/api/auth/refresh-token",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Fresh token", body = AuthResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn refresh_token_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.forum.users.refresh_token(&auth).await?))
}
