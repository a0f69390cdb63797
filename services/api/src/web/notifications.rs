//! services/api/src/web/notifications.rs
//!
//! The caller's own notification feed. Every operation is scoped to the
//! authenticated user; foreign ids simply match nothing.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::forum::views::{DeletedCount, ModifiedCount, NotificationFeed};
use crate::web::rest::PageQuery;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    /// Omit or leave empty to mark every notification as read.
    #[serde(default)]
    pub notification_ids: Vec<Uuid>,
}

/// GET /api/notifications - The caller's feed, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notifications",
    security(("bearer" = [])),
    params(PageQuery),
    responses((status = 200, description = "A page of the feed", body = NotificationFeed))
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<NotificationFeed>> {
    let feed = state
        .forum
        .notifications
        .get_notifications(auth.id, query.request()?)
        .await?;
    Ok(Json(feed))
}

/// POST /api/notifications/mark-read - Mark some or all notifications read
#[utoipa::path(
    post,
    path = "/api/notifications/mark-read",
    tag = "notifications",
    security(("bearer" = [])),
    request_body = MarkReadRequest,
    responses((status = 200, description = "Rows that changed from unread to read", body = ModifiedCount))
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: Bytes,
) -> ApiResult<Json<ModifiedCount>> {
    // An empty body means "all".
    let ids = if body.iter().all(u8::is_ascii_whitespace) {
        Vec::new()
    } else {
        serde_json::from_slice::<MarkReadRequest>(&body)
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?
            .notification_ids
    };
    let modified_count = state
        .forum
        .notifications
        .mark_as_read(auth.id, &ids)
        .await?;
    Ok(Json(ModifiedCount { modified_count }))
}

/// DELETE /api/notifications/{id} - Delete one notification
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "notifications",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses((status = 200, description = "0 when the id is unknown or not the caller's", body = DeletedCount))
)]
pub async fn delete_notification_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeletedCount>> {
    let deleted_count = state
        .forum
        .notifications
        .delete_notification(id, auth.id)
        .await?;
    Ok(Json(DeletedCount { deleted_count }))
}

/// DELETE /api/notifications - Clear the caller's feed
#[utoipa::path(
    delete,
    path = "/api/notifications",
    tag = "notifications",
    security(("bearer" = [])),
    responses((status = 200, description = "Number of notifications removed", body = DeletedCount))
)]
pub async fn delete_all_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<DeletedCount>> {
    let deleted_count = state
        .forum
        .notifications
        .delete_all_notifications(auth.id)
        .await?;
    Ok(Json(DeletedCount { deleted_count }))
}
