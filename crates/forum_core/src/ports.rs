//! crates/forum_core/src/ports.rs
//!
//! Defines the document-store contract the forum is written against.
//! The store is an external collaborator: any backend that offers lookup by
//! field equality, atomic counter increments and set-membership array updates
//! can implement `ForumStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Category, Notification, Post, Topic, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint was violated; the message names the field.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Store Port
//=========================================================================================

#[async_trait]
pub trait ForumStore: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` naming `username` or `email` on duplicates.
    async fn insert_user(&self, user: &User) -> PortResult<()>;
    async fn find_user(&self, id: Uuid) -> PortResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>>;
    async fn update_user(&self, user: &User) -> PortResult<()>;
    async fn touch_user(&self, id: Uuid, at: DateTime<Utc>) -> PortResult<()>;
    /// Oldest accounts first.
    async fn list_users(&self, skip: u64, limit: u64) -> PortResult<Vec<User>>;
    async fn count_users(&self) -> PortResult<u64>;

    // --- Categories ---
    /// Fails with `Conflict` on a duplicate slug.
    async fn insert_category(&self, category: &Category) -> PortResult<()>;
    async fn find_category(&self, id: Uuid) -> PortResult<Option<Category>>;
    async fn find_category_by_slug(&self, slug: &str) -> PortResult<Option<Category>>;
    async fn update_category(&self, category: &Category) -> PortResult<()>;
    async fn delete_category(&self, id: Uuid) -> PortResult<bool>;
    /// Ordered by `order`, then name.
    async fn list_categories(&self, include_inactive: bool) -> PortResult<Vec<Category>>;
    async fn list_child_categories(&self, parent: Uuid) -> PortResult<Vec<Category>>;

    // --- Topics ---
    async fn insert_topic(&self, topic: &Topic) -> PortResult<()>;
    async fn find_topic(&self, id: Uuid) -> PortResult<Option<Topic>>;
    async fn find_topic_by_slug(&self, slug: &str) -> PortResult<Option<Topic>>;
    async fn update_topic(&self, topic: &Topic) -> PortResult<()>;
    async fn delete_topic(&self, id: Uuid) -> PortResult<bool>;
    /// Newest first.
    async fn list_latest_topics(&self, skip: u64, limit: u64) -> PortResult<Vec<Topic>>;
    async fn count_topics(&self) -> PortResult<u64>;
    /// Pinned first, then most recent activity.
    async fn list_topics_in_category(
        &self,
        category_id: Uuid,
        skip: u64,
        limit: u64,
    ) -> PortResult<Vec<Topic>>;
    async fn count_topics_in_category(&self, category_id: Uuid) -> PortResult<u64>;
    async fn count_topics_by_author(&self, author_id: Uuid) -> PortResult<u64>;
    async fn increment_view_count(&self, id: Uuid) -> PortResult<()>;
    /// Atomically bumps `reply_count` and points the topic at its newest post.
    async fn record_reply(&self, topic_id: Uuid, post_id: Uuid, at: DateTime<Utc>) -> PortResult<()>;
    /// Atomically lowers `reply_count`, never below zero.
    async fn decrement_reply_count(&self, topic_id: Uuid) -> PortResult<()>;
    async fn set_last_post(
        &self,
        topic_id: Uuid,
        post_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> PortResult<()>;
    async fn set_reply_count(&self, topic_id: Uuid, count: i64) -> PortResult<()>;

    // --- Posts ---
    async fn insert_post(&self, post: &Post) -> PortResult<()>;
    async fn find_post(&self, id: Uuid) -> PortResult<Option<Post>>;
    async fn update_post(&self, post: &Post) -> PortResult<()>;
    async fn delete_post(&self, id: Uuid) -> PortResult<bool>;
    /// Oldest first.
    async fn list_posts_in_topic(&self, topic_id: Uuid, skip: u64, limit: u64) -> PortResult<Vec<Post>>;
    async fn count_posts_in_topic(&self, topic_id: Uuid) -> PortResult<u64>;
    async fn first_post_in_topic(&self, topic_id: Uuid) -> PortResult<Option<Post>>;
    async fn latest_post_in_topic(&self, topic_id: Uuid) -> PortResult<Option<Post>>;
    /// Number of other posts whose `reply_to` is `post_id`.
    async fn count_replies_to(&self, post_id: Uuid) -> PortResult<u64>;
    async fn delete_posts_in_topic(&self, topic_id: Uuid) -> PortResult<u64>;
    async fn count_posts_by_author(&self, author_id: Uuid) -> PortResult<u64>;
    /// Adds `user_id` to the post's like set. Returns `false` if already present.
    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool>;
    /// Removes `user_id` from the post's like set. Returns `false` if absent.
    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool>;

    // --- Notifications ---
    async fn insert_notification(&self, notification: &Notification) -> PortResult<()>;
    /// Newest first, scoped to the recipient.
    async fn list_notifications(&self, user_id: Uuid, skip: u64, limit: u64) -> PortResult<Vec<Notification>>;
    async fn count_notifications(&self, user_id: Uuid) -> PortResult<u64>;
    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64>;
    /// Marks unread notifications of `user_id` as read; `None` means all of them.
    /// Returns how many rows actually changed.
    async fn mark_notifications_read(&self, user_id: Uuid, ids: Option<&[Uuid]>) -> PortResult<u64>;
    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> PortResult<u64>;
    async fn delete_all_notifications(&self, user_id: Uuid) -> PortResult<u64>;
}
