pub mod auth;
pub mod categories;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod rest;
pub mod state;
pub mod topics;
pub mod users;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
pub use middleware::require_auth;
use state::AppState;

/// CORS policy for the single configured front-end origin.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ApiError> {
    let origin = origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin '{}': {}", origin, e)))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]))
}

/// Builds the `/api` router. Protected routes share paths with public ones,
/// so each group is layered separately and then merged per path.
pub fn build_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/categories", get(categories::list_categories_handler))
        .route("/api/categories/{key}", get(categories::get_category_handler))
        .route("/api/topics/latest", get(topics::latest_topics_handler))
        .route("/api/topics/category/{key}", get(topics::category_topics_handler))
        .route("/api/topics/{key}", get(topics::get_topic_handler))
        .route("/api/posts/topic/{topic}", get(posts::list_posts_handler))
        .route("/api/users/public", get(users::public_users_handler))
        .route("/api/users/profile/{key}", get(users::profile_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/auth/refresh-token", post(auth::refresh_token_handler))
        .route("/api/categories", post(categories::create_category_handler))
        .route(
            "/api/categories/{key}",
            put(categories::update_category_handler).delete(categories::delete_category_handler),
        )
        .route("/api/topics", post(topics::create_topic_handler))
        .route(
            "/api/topics/{key}",
            put(topics::update_topic_handler).delete(topics::delete_topic_handler),
        )
        .route("/api/topics/{key}/reconcile", post(topics::reconcile_topic_handler))
        .route("/api/posts", post(posts::create_post_handler))
        .route(
            "/api/posts/{id}",
            put(posts::update_post_handler).delete(posts::delete_post_handler),
        )
        .route("/api/posts/{id}/like", post(posts::toggle_like_handler))
        .route(
            "/api/notifications",
            get(notifications::list_notifications_handler)
                .delete(notifications::delete_all_notifications_handler),
        )
        .route("/api/notifications/mark-read", post(notifications::mark_read_handler))
        .route(
            "/api/notifications/{id}",
            axum::routing::delete(notifications::delete_notification_handler),
        )
        .route("/api/users", get(users::list_users_handler))
        .route(
            "/api/users/profile",
            get(users::own_profile_handler).put(users::update_profile_handler),
        )
        .route("/api/users/profile/password", put(users::change_password_handler))
        .route("/api/users/{id}", put(users::admin_update_user_handler))
        .route("/api/users/{id}/role", put(users::set_role_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = cors_layer(&state.config.cors_origin)?;
    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(state))
}
