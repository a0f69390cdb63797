//! services/api/src/forum/views.rs
//!
//! Denormalized response payloads. Each view is assembled by hand from the
//! documents it joins (author, category, last post, actor).

use chrono::{DateTime, Utc};
use forum_core::domain::{
    Category, Notification, NotificationKind, NotificationSettings, Post, Role, Topic, User,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Users
//=========================================================================================

/// The minimal author block attached to topics and posts.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    #[schema(value_type = String)]
    pub role: Role,
}

impl From<&User> for AuthorView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub email_notifications: bool,
    pub site_notifications: bool,
    pub notify_on_replies: bool,
    pub notify_on_mentions: bool,
    pub notify_on_likes: bool,
    pub notify_on_topic_replies: bool,
    pub notify_on_role_changes: bool,
}

impl From<NotificationSettings> for SettingsView {
    fn from(s: NotificationSettings) -> Self {
        Self {
            email_notifications: s.email_notifications,
            site_notifications: s.site_notifications,
            notify_on_replies: s.notify_on_replies,
            notify_on_mentions: s.notify_on_mentions,
            notify_on_likes: s.notify_on_likes,
            notify_on_topic_replies: s.notify_on_topic_replies,
            notify_on_role_changes: s.notify_on_role_changes,
        }
    }
}

impl From<SettingsView> for NotificationSettings {
    fn from(s: SettingsView) -> Self {
        Self {
            email_notifications: s.email_notifications,
            site_notifications: s.site_notifications,
            notify_on_replies: s.notify_on_replies,
            notify_on_mentions: s.notify_on_mentions,
            notify_on_likes: s.notify_on_likes,
            notify_on_topic_replies: s.notify_on_topic_replies,
            notify_on_role_changes: s.notify_on_role_changes,
        }
    }
}

/// Everything about an account except its password hash. Only shown to the
/// account owner and to moderators.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[schema(value_type = String)]
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub settings: SettingsView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
            settings: user.settings.into(),
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_active: user.last_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserView {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    #[schema(value_type = String)]
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl From<&User> for PublicUserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
            created_at: user.created_at,
            last_active: user.last_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user: PublicUserView,
    pub topic_count: u64,
    pub post_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserView,
}

//=========================================================================================
// Categories
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub order: i32,
    pub is_active: bool,
    pub parent_category: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub topic_count: u64,
}

impl CategoryView {
    pub fn new(category: &Category, topic_count: u64) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            description: category.description.clone(),
            slug: category.slug.clone(),
            order: category.order,
            is_active: category.is_active,
            parent_category: category.parent_category,
            created_by: category.created_by,
            created_at: category.created_at,
            updated_at: category.updated_at,
            topic_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    pub category: CategoryView,
    pub subcategories: Vec<CategoryView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
        }
    }
}

//=========================================================================================
// Topics and posts
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastPostView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub author: Option<AuthorView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub category_id: Uuid,
    pub author: Option<AuthorView>,
    pub tags: Vec<String>,
    pub view_count: i64,
    pub reply_count: i64,
    pub last_post_id: Option<Uuid>,
    pub last_post_at: DateTime<Utc>,
    pub last_post: Option<LastPostView>,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TopicView {
    pub fn new(topic: &Topic, author: Option<&User>, last_post: Option<LastPostView>) -> Self {
        Self {
            id: topic.id,
            title: topic.title.clone(),
            content: topic.content.clone(),
            slug: topic.slug.clone(),
            category_id: topic.category_id,
            author: author.map(AuthorView::from),
            tags: topic.tags.clone(),
            view_count: topic.view_count,
            reply_count: topic.reply_count,
            last_post_id: topic.last_post_id,
            last_post_at: topic.last_post_at,
            last_post,
            is_pinned: topic.is_pinned,
            is_locked: topic.is_locked,
            created_at: topic.created_at,
            updated_at: topic.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
    pub topic: TopicView,
    pub category: Option<CategorySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub content: String,
    pub topic_id: Uuid,
    pub author: Option<AuthorView>,
    pub reply_to: Option<Uuid>,
    pub is_edited: bool,
    pub likes: Vec<Uuid>,
    pub like_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_edited_at: Option<DateTime<Utc>>,
}

impl PostView {
    pub fn new(post: &Post, author: Option<&User>) -> Self {
        Self {
            id: post.id,
            content: post.content.clone(),
            topic_id: post.topic_id,
            author: author.map(AuthorView::from),
            reply_to: post.reply_to,
            is_edited: post.is_edited,
            likes: post.likes.clone(),
            like_count: post.likes.len(),
            created_at: post.created_at,
            updated_at: post.updated_at,
            last_edited_at: post.last_edited_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTopic {
    pub topic: TopicView,
    pub post: PostView,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResult {
    pub liked: bool,
    pub like_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostResult {
    pub message: String,
    /// `true` when the post was tombstoned instead of removed.
    pub soft_deleted: bool,
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActorView {
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
}

impl From<&User> for ActorView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub actor: Option<ActorView>,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub target_url: Option<String>,
    pub topic_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl NotificationView {
    pub fn new(n: &Notification, actor: Option<&User>) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            actor: actor.map(ActorView::from),
            kind: n.kind,
            title: n.title.clone(),
            message: n.message.clone(),
            read: n.read,
            target_url: n.target_url.clone(),
            topic_id: n.topic_id,
            post_id: n.post_id,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub notifications: Vec<NotificationView>,
    pub total_notifications: u64,
    pub unread_count: u64,
    pub current_page: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedCount {
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCount {
    pub deleted_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
