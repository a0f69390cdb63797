//! services/api/src/web/users.rs

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use forum_core::domain::Identifier;
use forum_core::pagination::Paginated;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::forum::users::{AdminUserUpdate, PasswordChange, ProfileUpdate, RoleChange};
use crate::forum::views::{MessageResponse, ProfileView, PublicUserView, UserView};
use crate::web::rest::{PageDoc, PageQuery};
use crate::web::state::AppState;

/// GET /api/users - Full account list, emails included
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(("bearer" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "A page of accounts", body = PageDoc<UserView>),
        (status = 403, description = "Requires the teacher role")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Paginated<UserView>>> {
    Ok(Json(
        state.forum.users.list_users(&auth, query.request()?).await?,
    ))
}

/// GET /api/users/public - Member directory without emails
#[utoipa::path(
    get,
    path = "/api/users/public",
    tag = "users",
    params(PageQuery),
    responses((status = 200, description = "A page of members", body = PageDoc<PublicUserView>))
)]
pub async fn public_users_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Paginated<PublicUserView>>> {
    Ok(Json(state.forum.users.public_users(query.request()?).await?))
}

/// GET /api/users/profile - The caller's own account
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "users",
    security(("bearer" = [])),
    responses((status = 200, description = "Current account", body = UserView))
)]
pub async fn own_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.forum.users.me(&auth).await?))
}

/// PUT /api/users/profile - Update display name, bio, avatar or settings
#[utoipa::path(
    put,
    path = "/api/users/profile",
    tag = "users",
    security(("bearer" = [])),
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = UserView),
        (status = 400, description = "Empty display name")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ProfileUpdate>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.forum.users.update_profile(&auth, req).await?))
}

/// PUT /api/users/profile/password - Change the caller's password
#[utoipa::path(
    put,
    path = "/api/users/profile/password",
    tag = "users",
    security(("bearer" = [])),
    request_body = PasswordChange,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Wrong current password or weak new password")
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<PasswordChange>,
) -> ApiResult<Json<MessageResponse>> {
    state.forum.users.change_password(&auth, req).await?;
    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

/// GET /api/users/profile/{key} - Public profile with activity counts
#[utoipa::path(
    get,
    path = "/api/users/profile/{key}",
    tag = "users",
    params(("key" = String, Path, description = "User id or username")),
    responses(
        (status = 200, description = "Public profile", body = ProfileView),
        (status = 404, description = "No such user")
    )
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(
        state.forum.users.profile(&Identifier::parse(&key)).await?,
    ))
}

/// PUT /api/users/{id} - Admin edit of any account
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AdminUserUpdate,
    responses(
        (status = 200, description = "Account updated", body = UserView),
        (status = 403, description = "Requires the admin role")
    )
)]
pub async fn admin_update_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdminUserUpdate>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(
        state.forum.users.admin_update_user(&auth, id, req).await?,
    ))
}

/// PUT /api/users/{id}/role - Change an account's role
#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleChange,
    responses(
        (status = 200, description = "Role changed", body = UserView),
        (status = 403, description = "Requires the admin role")
    )
)]
pub async fn set_role_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<RoleChange>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.forum.users.set_role(&auth, id, req.role).await?))
}
