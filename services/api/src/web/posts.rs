//! services/api/src/web/posts.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use forum_core::domain::Identifier;
use forum_core::pagination::Paginated;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::forum::posts::{NewPost, PostEdit};
use crate::forum::views::{DeletePostResult, LikeResult, PostView};
use crate::web::rest::{PageDoc, PageQuery};
use crate::web::state::AppState;

/// GET /api/posts/topic/{topic} - Posts of a topic, oldest first
#[utoipa::path(
    get,
    path = "/api/posts/topic/{topic}",
    tag = "posts",
    params(("topic" = String, Path, description = "Topic id or slug"), PageQuery),
    responses(
        (status = 200, description = "A page of posts", body = PageDoc<PostView>),
        (status = 404, description = "No such topic")
    )
)]
pub async fn list_posts_handler(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Paginated<PostView>>> {
    let page = state
        .forum
        .posts
        .list_posts(&Identifier::parse(&topic), query.request()?)
        .await?;
    Ok(Json(page))
}

/// POST /api/posts - Reply in a topic
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    security(("bearer" = [])),
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = PostView),
        (status = 400, description = "Empty content or reply target in another topic"),
        (status = 403, description = "Topic is locked"),
        (status = 404, description = "No such topic or reply target")
    )
)]
pub async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewPost>,
) -> ApiResult<impl IntoResponse> {
    let post = state.forum.posts.create_post(&auth, req).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/posts/{id} - Edit a post
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "posts",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = PostEdit,
    responses(
        (status = 200, description = "Post updated", body = PostView),
        (status = 403, description = "Not the author, or the topic is locked")
    )
)]
pub async fn update_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<PostEdit>,
) -> ApiResult<Json<PostView>> {
    Ok(Json(state.forum.posts.update_post(&auth, id, req).await?))
}

/// DELETE /api/posts/{id} - Delete a post, or blank it if replies point at it
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post removed", body = DeletePostResult),
        (status = 400, description = "The opening post of a topic"),
        (status = 403, description = "Not the author, or the topic is locked")
    )
)]
pub async fn delete_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeletePostResult>> {
    Ok(Json(state.forum.posts.delete_post(&auth, id).await?))
}

/// POST /api/posts/{id}/like - Like or unlike a post
#[utoipa::path(
    post,
    path = "/api/posts/{id}/like",
    tag = "posts",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "New like state", body = LikeResult),
        (status = 404, description = "No such post")
    )
)]
pub async fn toggle_like_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LikeResult>> {
    Ok(Json(state.forum.posts.toggle_like(&auth, id).await?))
}
