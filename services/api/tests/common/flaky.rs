//! A store that delegates to `MemoryStore` but can be told to refuse writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forum_api::adapters::MemoryStore;
use forum_core::domain::{Category, Notification, Post, Topic, User};
use forum_core::ports::{ForumStore, PortError, PortResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    pub fail_post_inserts: AtomicBool,
    pub fail_notification_inserts: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_post_inserts: AtomicBool::new(false),
            fail_notification_inserts: AtomicBool::new(false),
        }
    }

    pub fn refuse_posts(&self, refuse: bool) {
        self.fail_post_inserts.store(refuse, Ordering::SeqCst);
    }

    pub fn refuse_notifications(&self, refuse: bool) {
        self.fail_notification_inserts.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl ForumStore for FlakyStore {
    async fn insert_user(&self, user: &User) -> PortResult<()> {
        self.inner.insert_user(user).await
    }

    async fn find_user(&self, id: Uuid) -> PortResult<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        self.inner.find_user_by_username(username).await
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn update_user(&self, user: &User) -> PortResult<()> {
        self.inner.update_user(user).await
    }

    async fn touch_user(&self, id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        self.inner.touch_user(id, at).await
    }

    async fn list_users(&self, skip: u64, limit: u64) -> PortResult<Vec<User>> {
        self.inner.list_users(skip, limit).await
    }

    async fn count_users(&self) -> PortResult<u64> {
        self.inner.count_users().await
    }

    async fn insert_category(&self, category: &Category) -> PortResult<()> {
        self.inner.insert_category(category).await
    }

    async fn find_category(&self, id: Uuid) -> PortResult<Option<Category>> {
        self.inner.find_category(id).await
    }

    async fn find_category_by_slug(&self, slug: &str) -> PortResult<Option<Category>> {
        self.inner.find_category_by_slug(slug).await
    }

    async fn update_category(&self, category: &Category) -> PortResult<()> {
        self.inner.update_category(category).await
    }

    async fn delete_category(&self, id: Uuid) -> PortResult<bool> {
        self.inner.delete_category(id).await
    }

    async fn list_categories(&self, include_inactive: bool) -> PortResult<Vec<Category>> {
        self.inner.list_categories(include_inactive).await
    }

    async fn list_child_categories(&self, parent: Uuid) -> PortResult<Vec<Category>> {
        self.inner.list_child_categories(parent).await
    }

    async fn insert_topic(&self, topic: &Topic) -> PortResult<()> {
        self.inner.insert_topic(topic).await
    }

    async fn find_topic(&self, id: Uuid) -> PortResult<Option<Topic>> {
        self.inner.find_topic(id).await
    }

    async fn find_topic_by_slug(&self, slug: &str) -> PortResult<Option<Topic>> {
        self.inner.find_topic_by_slug(slug).await
    }

    async fn update_topic(&self, topic: &Topic) -> PortResult<()> {
        self.inner.update_topic(topic).await
    }

    async fn delete_topic(&self, id: Uuid) -> PortResult<bool> {
        self.inner.delete_topic(id).await
    }

    async fn list_latest_topics(&self, skip: u64, limit: u64) -> PortResult<Vec<Topic>> {
        self.inner.list_latest_topics(skip, limit).await
    }

    async fn count_topics(&self) -> PortResult<u64> {
        self.inner.count_topics().await
    }

    async fn list_topics_in_category(&self, category_id: Uuid, skip: u64, limit: u64) -> PortResult<Vec<Topic>> {
        self.inner.list_topics_in_category(category_id, skip, limit).await
    }

    async fn count_topics_in_category(&self, category_id: Uuid) -> PortResult<u64> {
        self.inner.count_topics_in_category(category_id).await
    }

    async fn count_topics_by_author(&self, author_id: Uuid) -> PortResult<u64> {
        self.inner.count_topics_by_author(author_id).await
    }

    async fn increment_view_count(&self, id: Uuid) -> PortResult<()> {
        self.inner.increment_view_count(id).await
    }

    async fn record_reply(&self, topic_id: Uuid, post_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        self.inner.record_reply(topic_id, post_id, at).await
    }

    async fn decrement_reply_count(&self, topic_id: Uuid) -> PortResult<()> {
        self.inner.decrement_reply_count(topic_id).await
    }

    async fn set_last_post(&self, topic_id: Uuid, post_id: Option<Uuid>, at: DateTime<Utc>) -> PortResult<()> {
        self.inner.set_last_post(topic_id, post_id, at).await
    }

    async fn set_reply_count(&self, topic_id: Uuid, count: i64) -> PortResult<()> {
        self.inner.set_reply_count(topic_id, count).await
    }

    async fn insert_post(&self, post: &Post) -> PortResult<()> {
        if self.fail_post_inserts.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("post insert refused".to_string()));
        }
        self.inner.insert_post(post).await
    }

    async fn find_post(&self, id: Uuid) -> PortResult<Option<Post>> {
        self.inner.find_post(id).await
    }

    async fn update_post(&self, post: &Post) -> PortResult<()> {
        self.inner.update_post(post).await
    }

    async fn delete_post(&self, id: Uuid) -> PortResult<bool> {
        self.inner.delete_post(id).await
    }

    async fn list_posts_in_topic(&self, topic_id: Uuid, skip: u64, limit: u64) -> PortResult<Vec<Post>> {
        self.inner.list_posts_in_topic(topic_id, skip, limit).await
    }

    async fn count_posts_in_topic(&self, topic_id: Uuid) -> PortResult<u64> {
        self.inner.count_posts_in_topic(topic_id).await
    }

    async fn first_post_in_topic(&self, topic_id: Uuid) -> PortResult<Option<Post>> {
        self.inner.first_post_in_topic(topic_id).await
    }

    async fn latest_post_in_topic(&self, topic_id: Uuid) -> PortResult<Option<Post>> {
        self.inner.latest_post_in_topic(topic_id).await
    }

    async fn count_replies_to(&self, post_id: Uuid) -> PortResult<u64> {
        self.inner.count_replies_to(post_id).await
    }

    async fn delete_posts_in_topic(&self, topic_id: Uuid) -> PortResult<u64> {
        self.inner.delete_posts_in_topic(topic_id).await
    }

    async fn count_posts_by_author(&self, author_id: Uuid) -> PortResult<u64> {
        self.inner.count_posts_by_author(author_id).await
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.inner.add_like(post_id, user_id).await
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.inner.remove_like(post_id, user_id).await
    }

    async fn insert_notification(&self, notification: &Notification) -> PortResult<()> {
        if self.fail_notification_inserts.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("notification insert refused".to_string()));
        }
        self.inner.insert_notification(notification).await
    }

    async fn list_notifications(&self, user_id: Uuid, skip: u64, limit: u64) -> PortResult<Vec<Notification>> {
        self.inner.list_notifications(user_id, skip, limit).await
    }

    async fn count_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        self.inner.count_notifications(user_id).await
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        self.inner.count_unread_notifications(user_id).await
    }

    async fn mark_notifications_read(&self, user_id: Uuid, ids: Option<&[Uuid]>) -> PortResult<u64> {
        self.inner.mark_notifications_read(user_id, ids).await
    }

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> PortResult<u64> {
        self.inner.delete_notification(id, user_id).await
    }

    async fn delete_all_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        self.inner.delete_all_notifications(user_id).await
    }
}
