//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `ForumStore` port. Every operation takes
//! the single lock, so each call is atomic with respect to the others. Used for
//! local development (`DATABASE_URL=memory://`) and as the test fixture.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forum_core::domain::{Category, Notification, Post, Topic, User};
use forum_core::ports::{ForumStore, PortError, PortResult};
use std::cmp::Reverse;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Rows are kept in insertion order, which doubles as the creation-time tiebreaker.
#[derive(Default)]
struct Collections {
    users: Vec<User>,
    categories: Vec<Category>,
    topics: Vec<Topic>,
    posts: Vec<Post>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, skip: u64, limit: u64) -> Vec<T> {
    items.skip(skip as usize).take(limit as usize).collect()
}

fn replace<T, F: Fn(&T) -> bool>(rows: &mut [T], matches: F, value: T) -> PortResult<()> {
    match rows.iter_mut().find(|row| matches(row)) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(PortError::NotFound("Document not found".to_string())),
    }
}

#[async_trait]
impl ForumStore for MemoryStore {
    // --- Users ---

    async fn insert_user(&self, user: &User) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if db.users.iter().any(|u| u.username == user.username) {
            return Err(PortError::Conflict("Username is already taken".to_string()));
        }
        if db.users.iter().any(|u| u.email == user.email) {
            return Err(PortError::Conflict("Email is already registered".to_string()));
        }
        db.users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> PortResult<Option<User>> {
        let db = self.inner.read().await;
        Ok(db.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let db = self.inner.read().await;
        Ok(db.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let db = self.inner.read().await;
        Ok(db.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if db
            .users
            .iter()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(PortError::Conflict("Username is already taken".to_string()));
        }
        if db.users.iter().any(|u| u.id != user.id && u.email == user.email) {
            return Err(PortError::Conflict("Email is already registered".to_string()));
        }
        replace(&mut db.users, |u| u.id == user.id, user.clone())
    }

    async fn touch_user(&self, id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if let Some(user) = db.users.iter_mut().find(|u| u.id == id) {
            user.last_active = at;
        }
        Ok(())
    }

    async fn list_users(&self, skip: u64, limit: u64) -> PortResult<Vec<User>> {
        let db = self.inner.read().await;
        Ok(page(db.users.iter().cloned(), skip, limit))
    }

    async fn count_users(&self) -> PortResult<u64> {
        Ok(self.inner.read().await.users.len() as u64)
    }

    // --- Categories ---

    async fn insert_category(&self, category: &Category) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if db.categories.iter().any(|c| c.slug == category.slug) {
            return Err(PortError::Conflict(
                "A category with this name already exists".to_string(),
            ));
        }
        db.categories.push(category.clone());
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> PortResult<Option<Category>> {
        let db = self.inner.read().await;
        Ok(db.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> PortResult<Option<Category>> {
        let db = self.inner.read().await;
        Ok(db.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn update_category(&self, category: &Category) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if db
            .categories
            .iter()
            .any(|c| c.id != category.id && c.slug == category.slug)
        {
            return Err(PortError::Conflict(
                "A category with this name already exists".to_string(),
            ));
        }
        replace(&mut db.categories, |c| c.id == category.id, category.clone())
    }

    async fn delete_category(&self, id: Uuid) -> PortResult<bool> {
        let mut db = self.inner.write().await;
        let before = db.categories.len();
        db.categories.retain(|c| c.id != id);
        Ok(db.categories.len() < before)
    }

    async fn list_categories(&self, include_inactive: bool) -> PortResult<Vec<Category>> {
        let db = self.inner.read().await;
        let mut out: Vec<Category> = db
            .categories
            .iter()
            .filter(|c| include_inactive || c.is_active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(out)
    }

    async fn list_child_categories(&self, parent: Uuid) -> PortResult<Vec<Category>> {
        let db = self.inner.read().await;
        let mut out: Vec<Category> = db
            .categories
            .iter()
            .filter(|c| c.parent_category == Some(parent))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(out)
    }

    // --- Topics ---

    async fn insert_topic(&self, topic: &Topic) -> PortResult<()> {
        self.inner.write().await.topics.push(topic.clone());
        Ok(())
    }

    async fn find_topic(&self, id: Uuid) -> PortResult<Option<Topic>> {
        let db = self.inner.read().await;
        Ok(db.topics.iter().find(|t| t.id == id).cloned())
    }

    async fn find_topic_by_slug(&self, slug: &str) -> PortResult<Option<Topic>> {
        let db = self.inner.read().await;
        Ok(db.topics.iter().find(|t| t.slug == slug).cloned())
    }

    async fn update_topic(&self, topic: &Topic) -> PortResult<()> {
        let mut db = self.inner.write().await;
        let slot = db
            .topics
            .iter_mut()
            .find(|t| t.id == topic.id)
            .ok_or_else(|| PortError::NotFound(format!("Topic {} not found", topic.id)))?;
        slot.title = topic.title.clone();
        slot.content = topic.content.clone();
        slot.slug = topic.slug.clone();
        slot.category_id = topic.category_id;
        slot.tags = topic.tags.clone();
        slot.is_pinned = topic.is_pinned;
        slot.is_locked = topic.is_locked;
        slot.updated_at = topic.updated_at;
        Ok(())
    }

    async fn delete_topic(&self, id: Uuid) -> PortResult<bool> {
        let mut db = self.inner.write().await;
        let before = db.topics.len();
        db.topics.retain(|t| t.id != id);
        Ok(db.topics.len() < before)
    }

    async fn list_latest_topics(&self, skip: u64, limit: u64) -> PortResult<Vec<Topic>> {
        let db = self.inner.read().await;
        let mut topics: Vec<(usize, &Topic)> = db.topics.iter().enumerate().collect();
        topics.sort_by_key(|(seq, t)| Reverse((t.created_at, *seq)));
        Ok(page(topics.into_iter().map(|(_, t)| t.clone()), skip, limit))
    }

    async fn count_topics(&self) -> PortResult<u64> {
        Ok(self.inner.read().await.topics.len() as u64)
    }

    async fn list_topics_in_category(
        &self,
        category_id: Uuid,
        skip: u64,
        limit: u64,
    ) -> PortResult<Vec<Topic>> {
        let db = self.inner.read().await;
        let mut topics: Vec<(usize, &Topic)> = db
            .topics
            .iter()
            .enumerate()
            .filter(|(_, t)| t.category_id == category_id)
            .collect();
        topics.sort_by_key(|(seq, t)| Reverse((t.is_pinned, t.last_post_at, *seq)));
        Ok(page(topics.into_iter().map(|(_, t)| t.clone()), skip, limit))
    }

    async fn count_topics_in_category(&self, category_id: Uuid) -> PortResult<u64> {
        let db = self.inner.read().await;
        Ok(db.topics.iter().filter(|t| t.category_id == category_id).count() as u64)
    }

    async fn count_topics_by_author(&self, author_id: Uuid) -> PortResult<u64> {
        let db = self.inner.read().await;
        Ok(db.topics.iter().filter(|t| t.author_id == author_id).count() as u64)
    }

    async fn increment_view_count(&self, id: Uuid) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if let Some(topic) = db.topics.iter_mut().find(|t| t.id == id) {
            topic.view_count += 1;
        }
        Ok(())
    }

    async fn record_reply(&self, topic_id: Uuid, post_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if let Some(topic) = db.topics.iter_mut().find(|t| t.id == topic_id) {
            topic.reply_count += 1;
            topic.last_post_id = Some(post_id);
            topic.last_post_at = at;
        }
        Ok(())
    }

    async fn decrement_reply_count(&self, topic_id: Uuid) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if let Some(topic) = db.topics.iter_mut().find(|t| t.id == topic_id) {
            topic.reply_count = (topic.reply_count - 1).max(0);
        }
        Ok(())
    }

    async fn set_last_post(
        &self,
        topic_id: Uuid,
        post_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if let Some(topic) = db.topics.iter_mut().find(|t| t.id == topic_id) {
            topic.last_post_id = post_id;
            topic.last_post_at = at;
        }
        Ok(())
    }

    async fn set_reply_count(&self, topic_id: Uuid, count: i64) -> PortResult<()> {
        let mut db = self.inner.write().await;
        if let Some(topic) = db.topics.iter_mut().find(|t| t.id == topic_id) {
            topic.reply_count = count;
        }
        Ok(())
    }

    // --- Posts ---

    async fn insert_post(&self, post: &Post) -> PortResult<()> {
        self.inner.write().await.posts.push(post.clone());
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> PortResult<Option<Post>> {
        let db = self.inner.read().await;
        Ok(db.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn update_post(&self, post: &Post) -> PortResult<()> {
        let mut db = self.inner.write().await;
        let slot = db
            .posts
            .iter_mut()
            .find(|p| p.id == post.id)
            .ok_or_else(|| PortError::NotFound(format!("Post {} not found", post.id)))?;
        slot.content = post.content.clone();
        slot.is_edited = post.is_edited;
        slot.updated_at = post.updated_at;
        slot.last_edited_at = post.last_edited_at;
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> PortResult<bool> {
        let mut db = self.inner.write().await;
        let before = db.posts.len();
        db.posts.retain(|p| p.id != id);
        Ok(db.posts.len() < before)
    }

    async fn list_posts_in_topic(&self, topic_id: Uuid, skip: u64, limit: u64) -> PortResult<Vec<Post>> {
        let db = self.inner.read().await;
        let mut posts: Vec<(usize, &Post)> = db
            .posts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.topic_id == topic_id)
            .collect();
        posts.sort_by_key(|(seq, p)| (p.created_at, *seq));
        Ok(page(posts.into_iter().map(|(_, p)| p.clone()), skip, limit))
    }

    async fn count_posts_in_topic(&self, topic_id: Uuid) -> PortResult<u64> {
        let db = self.inner.read().await;
        Ok(db.posts.iter().filter(|p| p.topic_id == topic_id).count() as u64)
    }

    async fn first_post_in_topic(&self, topic_id: Uuid) -> PortResult<Option<Post>> {
        let db = self.inner.read().await;
        Ok(db
            .posts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.topic_id == topic_id)
            .min_by_key(|(seq, p)| (p.created_at, *seq))
            .map(|(_, p)| p.clone()))
    }

    async fn latest_post_in_topic(&self, topic_id: Uuid) -> PortResult<Option<Post>> {
        let db = self.inner.read().await;
        Ok(db
            .posts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.topic_id == topic_id)
            .max_by_key(|(seq, p)| (p.created_at, *seq))
            .map(|(_, p)| p.clone()))
    }

    async fn count_replies_to(&self, post_id: Uuid) -> PortResult<u64> {
        let db = self.inner.read().await;
        Ok(db
            .posts
            .iter()
            .filter(|p| p.id != post_id && p.reply_to == Some(post_id))
            .count() as u64)
    }

    async fn delete_posts_in_topic(&self, topic_id: Uuid) -> PortResult<u64> {
        let mut db = self.inner.write().await;
        let before = db.posts.len();
        db.posts.retain(|p| p.topic_id != topic_id);
        Ok((before - db.posts.len()) as u64)
    }

    async fn count_posts_by_author(&self, author_id: Uuid) -> PortResult<u64> {
        let db = self.inner.read().await;
        Ok(db.posts.iter().filter(|p| p.author_id == author_id).count() as u64)
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let mut db = self.inner.write().await;
        match db.posts.iter_mut().find(|p| p.id == post_id) {
            Some(post) if !post.likes.contains(&user_id) => {
                post.likes.push(user_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let mut db = self.inner.write().await;
        match db.posts.iter_mut().find(|p| p.id == post_id) {
            Some(post) if post.likes.contains(&user_id) => {
                post.likes.retain(|id| *id != user_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // --- Notifications ---

    async fn insert_notification(&self, notification: &Notification) -> PortResult<()> {
        self.inner.write().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(&self, user_id: Uuid, skip: u64, limit: u64) -> PortResult<Vec<Notification>> {
        let db = self.inner.read().await;
        let mut rows: Vec<(usize, &Notification)> = db
            .notifications
            .iter()
            .enumerate()
            .filter(|(_, n)| n.user_id == user_id)
            .collect();
        rows.sort_by_key(|(seq, n)| Reverse((n.created_at, *seq)));
        Ok(page(rows.into_iter().map(|(_, n)| n.clone()), skip, limit))
    }

    async fn count_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        let db = self.inner.read().await;
        Ok(db.notifications.iter().filter(|n| n.user_id == user_id).count() as u64)
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        let db = self.inner.read().await;
        Ok(db
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as u64)
    }

    async fn mark_notifications_read(&self, user_id: Uuid, ids: Option<&[Uuid]>) -> PortResult<u64> {
        let mut db = self.inner.write().await;
        let now = Utc::now();
        let mut modified = 0;
        for n in db.notifications.iter_mut() {
            let selected = ids.map_or(true, |ids| ids.contains(&n.id));
            if n.user_id == user_id && !n.read && selected {
                n.read = true;
                n.updated_at = now;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> PortResult<u64> {
        let mut db = self.inner.write().await;
        let before = db.notifications.len();
        db.notifications.retain(|n| !(n.id == id && n.user_id == user_id));
        Ok((before - db.notifications.len()) as u64)
    }

    async fn delete_all_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        let mut db = self.inner.write().await;
        let before = db.notifications.len();
        db.notifications.retain(|n| n.user_id != user_id);
        Ok((before - db.notifications.len()) as u64)
    }
}
