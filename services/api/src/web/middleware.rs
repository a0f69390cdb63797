//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{bearer_token, AuthUser};
use crate::error::ApiError;
use crate::web::state::AppState;

/// Middleware that validates the bearer token and extracts the caller.
///
/// If valid, inserts the `AuthUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, req.headers())?
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Resolves the caller on public routes that behave differently for
/// signed-in users. A bad token is treated the same as no token.
pub fn optional_auth(state: &AppState, headers: &HeaderMap) -> Option<AuthUser> {
    authenticate(state, headers).ok().flatten()
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Malformed authorization header".to_string()))?;
    let token = bearer_token(value)
        .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".to_string()))?;
    state.tokens.verify(token).map(Some)
}
