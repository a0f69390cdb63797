//! services/api/src/web/topics.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use forum_core::domain::Identifier;
use forum_core::pagination::Paginated;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::forum::topics::{NewTopic, TopicUpdate};
use crate::forum::views::{CreatedTopic, MessageResponse, TopicDetail, TopicView};
use crate::web::rest::{PageDoc, PageQuery};
use crate::web::state::AppState;

/// GET /api/topics/latest - Newest topics across all categories
#[utoipa::path(
    get,
    path = "/api/topics/latest",
    tag = "topics",
    params(PageQuery),
    responses(
        (status = 200, description = "A page of topics", body = PageDoc<TopicView>),
        (status = 400, description = "Invalid page or limit")
    )
)]
pub async fn latest_topics_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Paginated<TopicView>>> {
    let page = state.forum.topics.latest_topics(query.request()?).await?;
    Ok(Json(page))
}

/// GET /api/topics/category/{key} - Topics of one category, pinned first
#[utoipa::path(
    get,
    path = "/api/topics/category/{key}",
    tag = "topics",
    params(("key" = String, Path, description = "Category id or slug"), PageQuery),
    responses(
        (status = 200, description = "A page of topics", body = PageDoc<TopicView>),
        (status = 404, description = "No such category")
    )
)]
pub async fn category_topics_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Paginated<TopicView>>> {
    let page = state
        .forum
        .topics
        .topics_in_category(&Identifier::parse(&key), query.request()?)
        .await?;
    Ok(Json(page))
}

/// GET /api/topics/{key} - Topic detail; counts as a view
#[utoipa::path(
    get,
    path = "/api/topics/{key}",
    tag = "topics",
    params(("key" = String, Path, description = "Topic id or slug")),
    responses(
        (status = 200, description = "Topic detail", body = TopicDetail),
        (status = 404, description = "No such topic")
    )
)]
pub async fn get_topic_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<TopicDetail>> {
    Ok(Json(
        state.forum.topics.get_topic(&Identifier::parse(&key)).await?,
    ))
}

/// POST /api/topics - Open a topic together with its first post
#[utoipa::path(
    post,
    path = "/api/topics",
    tag = "topics",
    security(("bearer" = [])),
    request_body = NewTopic,
    responses(
        (status = 201, description = "Topic created", body = CreatedTopic),
        (status = 400, description = "Missing title or content"),
        (status = 404, description = "No such category")
    )
)]
pub async fn create_topic_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewTopic>,
) -> ApiResult<impl IntoResponse> {
    let created = state.forum.topics.create_topic(&auth, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/topics/{key} - Edit, move, pin or lock a topic
#[utoipa::path(
    put,
    path = "/api/topics/{key}",
    tag = "topics",
    security(("bearer" = [])),
    params(("key" = String, Path, description = "Topic id or slug")),
    request_body = TopicUpdate,
    responses(
        (status = 200, description = "Topic updated", body = TopicView),
        (status = 403, description = "Not the author, or pin/lock without the teacher role")
    )
)]
pub async fn update_topic_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(key): Path<String>,
    Json(req): Json<TopicUpdate>,
) -> ApiResult<Json<TopicView>> {
    let topic = state
        .forum
        .topics
        .update_topic(&auth, &Identifier::parse(&key), req)
        .await?;
    Ok(Json(topic))
}

/// DELETE /api/topics/{key} - Delete a topic and all of its posts
#[utoipa::path(
    delete,
    path = "/api/topics/{key}",
    tag = "topics",
    security(("bearer" = [])),
    params(("key" = String, Path, description = "Topic id or slug")),
    responses(
        (status = 200, description = "Topic deleted", body = MessageResponse),
        (status = 403, description = "Not the author or a moderator")
    )
)]
pub async fn delete_topic_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let removed = state
        .forum
        .topics
        .delete_topic(&auth, &Identifier::parse(&key))
        .await?;
    Ok(Json(MessageResponse {
        message: format!("Topic deleted along with {} posts", removed),
    }))
}

/// POST /api/topics/{key}/reconcile - Recount replies and recompute the last post
#[utoipa::path(
    post,
    path = "/api/topics/{key}/reconcile",
    tag = "topics",
    security(("bearer" = [])),
    params(("key" = String, Path, description = "Topic id or slug")),
    responses(
        (status = 200, description = "Counters repaired", body = TopicView),
        (status = 403, description = "Requires the admin role")
    )
)]
pub async fn reconcile_topic_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(key): Path<String>,
) -> ApiResult<Json<TopicView>> {
    let topic = state
        .forum
        .topics
        .reconcile_topic(&auth, &Identifier::parse(&key))
        .await?;
    Ok(Json(topic))
}
