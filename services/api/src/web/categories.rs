//! services/api/src/web/categories.rs

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use forum_core::domain::{Identifier, Role};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::forum::categories::{CategoryUpdate, NewCategory};
use crate::forum::views::{CategoryDetail, CategoryView, MessageResponse};
use crate::web::middleware::optional_auth;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListQuery {
    /// Include inactive categories. Honored for teachers and admins only.
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/categories - All categories with topic counts
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    params(CategoryListQuery),
    responses((status = 200, description = "Categories ordered for display", body = Vec<CategoryView>))
)]
pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CategoryListQuery>,
) -> ApiResult<Json<Vec<CategoryView>>> {
    let privileged = optional_auth(&state, &headers)
        .map(|user| user.role.has_at_least(Role::Teacher))
        .unwrap_or(false);
    let categories = state
        .forum
        .categories
        .list_categories(query.include_inactive && privileged)
        .await?;
    Ok(Json(categories))
}

/// GET /api/categories/{key} - One category and its subcategories
#[utoipa::path(
    get,
    path = "/api/categories/{key}",
    tag = "categories",
    params(("key" = String, Path, description = "Category id or slug")),
    responses(
        (status = 200, description = "Category detail", body = CategoryDetail),
        (status = 404, description = "No such category")
    )
)]
pub async fn get_category_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<CategoryDetail>> {
    let detail = state
        .forum
        .categories
        .get_category(&Identifier::parse(&key))
        .await?;
    Ok(Json(detail))
}

/// POST /api/categories - Create a category
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    security(("bearer" = [])),
    request_body = NewCategory,
    responses(
        (status = 201, description = "Category created", body = CategoryView),
        (status = 403, description = "Requires the teacher role"),
        (status = 409, description = "Slug already in use")
    )
)]
pub async fn create_category_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewCategory>,
) -> ApiResult<impl IntoResponse> {
    let category = state.forum.categories.create_category(&auth, req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/{key} - Update a category
#[utoipa::path(
    put,
    path = "/api/categories/{key}",
    tag = "categories",
    security(("bearer" = [])),
    params(("key" = String, Path, description = "Category id or slug")),
    request_body = CategoryUpdate,
    responses(
        (status = 200, description = "Category updated", body = CategoryView),
        (status = 403, description = "Requires the teacher role"),
        (status = 404, description = "No such category")
    )
)]
pub async fn update_category_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(key): Path<String>,
    Json(req): Json<CategoryUpdate>,
) -> ApiResult<Json<CategoryView>> {
    let category = state
        .forum
        .categories
        .update_category(&auth, &Identifier::parse(&key), req)
        .await?;
    Ok(Json(category))
}

/// DELETE /api/categories/{key} - Delete an empty category
#[utoipa::path(
    delete,
    path = "/api/categories/{key}",
    tag = "categories",
    security(("bearer" = [])),
    params(("key" = String, Path, description = "Category id or slug")),
    responses(
        (status = 200, description = "Category deleted", body = MessageResponse),
        (status = 409, description = "Category still has subcategories or topics")
    )
)]
pub async fn delete_category_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .forum
        .categories
        .delete_category(&auth, &Identifier::parse(&key))
        .await?;
    Ok(Json(MessageResponse {
        message: "Category deleted".to_string(),
    }))
}
