//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, plus the query and
//! response shapes shared by the list endpoints.

use forum_core::pagination::PageRequest;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{IntoParams, Modify, OpenApi, ToSchema};

use crate::error::ApiResult;
use crate::forum::categories::{CategoryUpdate, NewCategory};
use crate::forum::posts::{NewPost, PostEdit};
use crate::forum::topics::{NewTopic, TopicUpdate};
use crate::forum::users::{
    AdminUserUpdate, LoginRequest, PasswordChange, ProfileUpdate, RegisterRequest, RoleChange,
};
use crate::forum::views::*;
use crate::web::notifications::MarkReadRequest;
use crate::web::{auth, categories, notifications, posts, topics, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::me_handler,
        auth::refresh_token_handler,
        categories::list_categories_handler,
        categories::get_category_handler,
        categories::create_category_handler,
        categories::update_category_handler,
        categories::delete_category_handler,
        topics::latest_topics_handler,
        topics::category_topics_handler,
        topics::get_topic_handler,
        topics::create_topic_handler,
        topics::update_topic_handler,
        topics::delete_topic_handler,
        topics::reconcile_topic_handler,
        posts::list_posts_handler,
        posts::create_post_handler,
        posts::update_post_handler,
        posts::delete_post_handler,
        posts::toggle_like_handler,
        notifications::list_notifications_handler,
        notifications::mark_read_handler,
        notifications::delete_notification_handler,
        notifications::delete_all_notifications_handler,
        users::list_users_handler,
        users::public_users_handler,
        users::own_profile_handler,
        users::update_profile_handler,
        users::change_password_handler,
        users::profile_handler,
        users::admin_update_user_handler,
        users::set_role_handler,
    ),
    components(
        schemas(
            RegisterRequest, LoginRequest, ProfileUpdate, PasswordChange, RoleChange,
            AdminUserUpdate, NewCategory, CategoryUpdate, NewTopic, TopicUpdate, NewPost,
            PostEdit, MarkReadRequest, PaginationDoc, AuthResponse, UserView, PublicUserView,
            ProfileView, SettingsView, AuthorView, CategoryView, CategoryDetail,
            CategorySummary, TopicView, TopicDetail, LastPostView, PostView, CreatedTopic,
            LikeResult, DeletePostResult, NotificationView, ActorView, NotificationFeed,
            ModifiedCount, DeletedCount, MessageResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and tokens."),
        (name = "categories", description = "The category taxonomy."),
        (name = "topics", description = "Discussion threads."),
        (name = "posts", description = "Replies, edits and likes."),
        (name = "notifications", description = "The per-user notification feed."),
        (name = "users", description = "Profiles and role management.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Shared query and response shapes
//=========================================================================================

/// `?page=&limit=` on every list endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Items per page, 1 to 100 (default 10).
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> ApiResult<PageRequest> {
        Ok(PageRequest::new(self.page, self.limit)?)
    }
}

/// Documentation shape of `forum_core::pagination::Pagination`.
#[derive(Serialize, ToSchema)]
#[schema(as = Pagination)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct PaginationDoc {
    current_page: u32,
    total_pages: u64,
    total_items: u64,
    has_more: bool,
}

/// Documentation shape of a paginated list.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PageDoc<T: ToSchema> {
    items: Vec<T>,
    pagination: PaginationDoc,
}
