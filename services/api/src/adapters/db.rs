//! services/api/src/adapters/db.rs
//!
//! This module contains the Postgres adapter, the production implementation
//! of the `ForumStore` port from the `core` crate. It handles all interactions
//! with the database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forum_core::domain::{Category, Notification, NotificationSettings, Post, Topic, User};
use forum_core::ports::{ForumStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ForumStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes the pool, waiting for in-flight connections to be returned.
    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}

fn map_err(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some("users_username_key") => "Username is already taken",
                Some("users_email_key") => "Email is already registered",
                Some("categories_slug_key") => "A category with this name already exists",
                _ => "Duplicate value",
            };
            return PortError::Conflict(message.to_string());
        }
    }
    PortError::Unexpected(e.to_string())
}

fn to_count(n: i64) -> u64 {
    n.max(0) as u64
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, username, email, password_hash, display_name, role, avatar, bio, \
     email_notifications, site_notifications, notify_on_replies, notify_on_mentions, \
     notify_on_likes, notify_on_topic_replies, notify_on_role_changes, \
     created_at, updated_at, last_active";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    display_name: String,
    role: String,
    avatar: Option<String>,
    bio: Option<String>,
    email_notifications: bool,
    site_notifications: bool,
    notify_on_replies: bool,
    notify_on_mentions: bool,
    notify_on_likes: bool,
    notify_on_topic_replies: bool,
    notify_on_role_changes: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            display_name: self.display_name,
            role: self.role.parse()?,
            avatar: self.avatar,
            bio: self.bio,
            settings: NotificationSettings {
                email_notifications: self.email_notifications,
                site_notifications: self.site_notifications,
                notify_on_replies: self.notify_on_replies,
                notify_on_mentions: self.notify_on_mentions,
                notify_on_likes: self.notify_on_likes,
                notify_on_topic_replies: self.notify_on_topic_replies,
                notify_on_role_changes: self.notify_on_role_changes,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_active: self.last_active,
        })
    }
}

const CATEGORY_COLUMNS: &str =
    "id, name, description, slug, sort_order, is_active, parent_category, created_by, created_at, updated_at";

#[derive(FromRow)]
struct CategoryRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    slug: String,
    sort_order: i32,
    is_active: bool,
    parent_category: Option<Uuid>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl CategoryRecord {
    fn to_domain(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
            description: self.description,
            slug: self.slug,
            order: self.sort_order,
            is_active: self.is_active,
            parent_category: self.parent_category,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const TOPIC_COLUMNS: &str = "id, title, content, slug, category_id, author_id, tags, view_count, \
     reply_count, last_post_id, last_post_at, is_pinned, is_locked, created_at, updated_at";

#[derive(FromRow)]
struct TopicRecord {
    id: Uuid,
    title: String,
    content: String,
    slug: String,
    category_id: Uuid,
    author_id: Uuid,
    tags: Vec<String>,
    view_count: i64,
    reply_count: i64,
    last_post_id: Option<Uuid>,
    last_post_at: DateTime<Utc>,
    is_pinned: bool,
    is_locked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl TopicRecord {
    fn to_domain(self) -> Topic {
        Topic {
            id: self.id,
            title: self.title,
            content: self.content,
            slug: self.slug,
            category_id: self.category_id,
            author_id: self.author_id,
            tags: self.tags,
            view_count: self.view_count,
            reply_count: self.reply_count,
            last_post_id: self.last_post_id,
            last_post_at: self.last_post_at,
            is_pinned: self.is_pinned,
            is_locked: self.is_locked,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const POST_COLUMNS: &str =
    "id, content, topic_id, author_id, reply_to, is_edited, likes, created_at, updated_at, last_edited_at";

#[derive(FromRow)]
struct PostRecord {
    id: Uuid,
    content: String,
    topic_id: Uuid,
    author_id: Uuid,
    reply_to: Option<Uuid>,
    is_edited: bool,
    likes: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_edited_at: Option<DateTime<Utc>>,
}
impl PostRecord {
    fn to_domain(self) -> Post {
        Post {
            id: self.id,
            content: self.content,
            topic_id: self.topic_id,
            author_id: self.author_id,
            reply_to: self.reply_to,
            is_edited: self.is_edited,
            likes: self.likes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_edited_at: self.last_edited_at,
        }
    }
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, actor_id, kind, title, message, read, target_url, \
     topic_id, post_id, created_at, updated_at";

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    user_id: Uuid,
    actor_id: Option<Uuid>,
    kind: String,
    title: String,
    message: String,
    read: bool,
    target_url: Option<String>,
    topic_id: Option<Uuid>,
    post_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> PortResult<Notification> {
        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            actor_id: self.actor_id,
            kind: self.kind.parse()?,
            title: self.title,
            message: self.message,
            read: self.read,
            target_url: self.target_url,
            topic_id: self.topic_id,
            post_id: self.post_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

//=========================================================================================
// `ForumStore` Trait Implementation
//=========================================================================================

impl DbAdapter {
    async fn user_where(&self, clause: &str, value: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, clause);
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .map(UserRecord::to_domain)
            .transpose()
    }

    async fn count(&self, sql: &str, id: Option<Uuid>) -> PortResult<u64> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let n = query.fetch_one(&self.pool).await.map_err(map_err)?;
        Ok(to_count(n))
    }
}

#[async_trait]
impl ForumStore for DbAdapter {
    // --- Users ---

    async fn insert_user(&self, user: &User) -> PortResult<()> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
            USER_COLUMNS
        );
        let s = &user.settings;
        sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.display_name)
            .bind(user.role.as_str())
            .bind(&user.avatar)
            .bind(&user.bio)
            .bind(s.email_notifications)
            .bind(s.site_notifications)
            .bind(s.notify_on_replies)
            .bind(s.notify_on_mentions)
            .bind(s.notify_on_likes)
            .bind(s.notify_on_topic_replies)
            .bind(s.notify_on_role_changes)
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(user.last_active)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> PortResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .map(UserRecord::to_domain)
            .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        self.user_where("username", username).await
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        self.user_where("email", email).await
    }

    async fn update_user(&self, user: &User) -> PortResult<()> {
        let s = &user.settings;
        sqlx::query(
            "UPDATE users SET username = $2, email = $3, password_hash = $4, display_name = $5, \
             role = $6, avatar = $7, bio = $8, email_notifications = $9, site_notifications = $10, \
             notify_on_replies = $11, notify_on_mentions = $12, notify_on_likes = $13, \
             notify_on_topic_replies = $14, notify_on_role_changes = $15, updated_at = $16, \
             last_active = $17 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(s.email_notifications)
        .bind(s.site_notifications)
        .bind(s.notify_on_replies)
        .bind(s.notify_on_mentions)
        .bind(s.notify_on_likes)
        .bind(s.notify_on_topic_replies)
        .bind(s.notify_on_role_changes)
        .bind(user.updated_at)
        .bind(user.last_active)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn touch_user(&self, id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        sqlx::query("UPDATE users SET last_active = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn list_users(&self, skip: u64, limit: u64) -> PortResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at ASC OFFSET $1 LIMIT $2",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(to_i64(skip))
            .bind(to_i64(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?
            .into_iter()
            .map(UserRecord::to_domain)
            .collect()
    }

    async fn count_users(&self) -> PortResult<u64> {
        self.count("SELECT COUNT(*) FROM users", None).await
    }

    // --- Categories ---

    async fn insert_category(&self, category: &Category) -> PortResult<()> {
        let sql = format!(
            "INSERT INTO categories ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            CATEGORY_COLUMNS
        );
        sqlx::query(&sql)
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(&category.slug)
            .bind(category.order)
            .bind(category.is_active)
            .bind(category.parent_category)
            .bind(category.created_by)
            .bind(category.created_at)
            .bind(category.updated_at)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> PortResult<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);
        let record = sqlx::query_as::<_, CategoryRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(record.map(CategoryRecord::to_domain))
    }

    async fn find_category_by_slug(&self, slug: &str) -> PortResult<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE slug = $1", CATEGORY_COLUMNS);
        let record = sqlx::query_as::<_, CategoryRecord>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(record.map(CategoryRecord::to_domain))
    }

    async fn update_category(&self, category: &Category) -> PortResult<()> {
        sqlx::query(
            "UPDATE categories SET name = $2, description = $3, slug = $4, sort_order = $5, \
             is_active = $6, parent_category = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.slug)
        .bind(category.order)
        .bind(category.is_active)
        .bind(category.parent_category)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self, include_inactive: bool) -> PortResult<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE ($1 OR is_active) ORDER BY sort_order ASC, name ASC",
            CATEGORY_COLUMNS
        );
        let records = sqlx::query_as::<_, CategoryRecord>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(records.into_iter().map(CategoryRecord::to_domain).collect())
    }

    async fn list_child_categories(&self, parent: Uuid) -> PortResult<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE parent_category = $1 ORDER BY sort_order ASC, name ASC",
            CATEGORY_COLUMNS
        );
        let records = sqlx::query_as::<_, CategoryRecord>(&sql)
            .bind(parent)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(records.into_iter().map(CategoryRecord::to_domain).collect())
    }

    // --- Topics ---

    async fn insert_topic(&self, topic: &Topic) -> PortResult<()> {
        let sql = format!(
            "INSERT INTO topics ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            TOPIC_COLUMNS
        );
        sqlx::query(&sql)
            .bind(topic.id)
            .bind(&topic.title)
            .bind(&topic.content)
            .bind(&topic.slug)
            .bind(topic.category_id)
            .bind(topic.author_id)
            .bind(&topic.tags)
            .bind(topic.view_count)
            .bind(topic.reply_count)
            .bind(topic.last_post_id)
            .bind(topic.last_post_at)
            .bind(topic.is_pinned)
            .bind(topic.is_locked)
            .bind(topic.created_at)
            .bind(topic.updated_at)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn find_topic(&self, id: Uuid) -> PortResult<Option<Topic>> {
        let sql = format!("SELECT {} FROM topics WHERE id = $1", TOPIC_COLUMNS);
        let record = sqlx::query_as::<_, TopicRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(record.map(TopicRecord::to_domain))
    }

    async fn find_topic_by_slug(&self, slug: &str) -> PortResult<Option<Topic>> {
        let sql = format!("SELECT {} FROM topics WHERE slug = $1", TOPIC_COLUMNS);
        let record = sqlx::query_as::<_, TopicRecord>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(record.map(TopicRecord::to_domain))
    }

    async fn update_topic(&self, topic: &Topic) -> PortResult<()> {
        // Counters and the last-post pointer are owned by the atomic helpers below.
        sqlx::query(
            "UPDATE topics SET title = $2, content = $3, slug = $4, category_id = $5, tags = $6, \
             is_pinned = $7, is_locked = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(topic.id)
        .bind(&topic.title)
        .bind(&topic.content)
        .bind(&topic.slug)
        .bind(topic.category_id)
        .bind(&topic.tags)
        .bind(topic.is_pinned)
        .bind(topic.is_locked)
        .bind(topic.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn delete_topic(&self, id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_latest_topics(&self, skip: u64, limit: u64) -> PortResult<Vec<Topic>> {
        let sql = format!(
            "SELECT {} FROM topics ORDER BY created_at DESC OFFSET $1 LIMIT $2",
            TOPIC_COLUMNS
        );
        let records = sqlx::query_as::<_, TopicRecord>(&sql)
            .bind(to_i64(skip))
            .bind(to_i64(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(records.into_iter().map(TopicRecord::to_domain).collect())
    }

    async fn count_topics(&self) -> PortResult<u64> {
        self.count("SELECT COUNT(*) FROM topics", None).await
    }

    async fn list_topics_in_category(
        &self,
        category_id: Uuid,
        skip: u64,
        limit: u64,
    ) -> PortResult<Vec<Topic>> {
        let sql = format!(
            "SELECT {} FROM topics WHERE category_id = $1 \
             ORDER BY is_pinned DESC, last_post_at DESC OFFSET $2 LIMIT $3",
            TOPIC_COLUMNS
        );
        let records = sqlx::query_as::<_, TopicRecord>(&sql)
            .bind(category_id)
            .bind(to_i64(skip))
            .bind(to_i64(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(records.into_iter().map(TopicRecord::to_domain).collect())
    }

    async fn count_topics_in_category(&self, category_id: Uuid) -> PortResult<u64> {
        self.count("SELECT COUNT(*) FROM topics WHERE category_id = $1", Some(category_id))
            .await
    }

    async fn count_topics_by_author(&self, author_id: Uuid) -> PortResult<u64> {
        self.count("SELECT COUNT(*) FROM topics WHERE author_id = $1", Some(author_id))
            .await
    }

    async fn increment_view_count(&self, id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE topics SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn record_reply(&self, topic_id: Uuid, post_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        sqlx::query(
            "UPDATE topics SET reply_count = reply_count + 1, last_post_id = $2, last_post_at = $3 \
             WHERE id = $1",
        )
        .bind(topic_id)
        .bind(post_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn decrement_reply_count(&self, topic_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE topics SET reply_count = GREATEST(reply_count - 1, 0) WHERE id = $1")
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn set_last_post(
        &self,
        topic_id: Uuid,
        post_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("UPDATE topics SET last_post_id = $2, last_post_at = $3 WHERE id = $1")
            .bind(topic_id)
            .bind(post_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn set_reply_count(&self, topic_id: Uuid, count: i64) -> PortResult<()> {
        sqlx::query("UPDATE topics SET reply_count = $2 WHERE id = $1")
            .bind(topic_id)
            .bind(count)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    // --- Posts ---

    async fn insert_post(&self, post: &Post) -> PortResult<()> {
        let sql = format!(
            "INSERT INTO posts ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            POST_COLUMNS
        );
        sqlx::query(&sql)
            .bind(post.id)
            .bind(&post.content)
            .bind(post.topic_id)
            .bind(post.author_id)
            .bind(post.reply_to)
            .bind(post.is_edited)
            .bind(&post.likes)
            .bind(post.created_at)
            .bind(post.updated_at)
            .bind(post.last_edited_at)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> PortResult<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
        let record = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(record.map(PostRecord::to_domain))
    }

    async fn update_post(&self, post: &Post) -> PortResult<()> {
        // `likes` is owned by add_like/remove_like.
        sqlx::query(
            "UPDATE posts SET content = $2, is_edited = $3, updated_at = $4, last_edited_at = $5 \
             WHERE id = $1",
        )
        .bind(post.id)
        .bind(&post.content)
        .bind(post.is_edited)
        .bind(post.updated_at)
        .bind(post.last_edited_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_posts_in_topic(&self, topic_id: Uuid, skip: u64, limit: u64) -> PortResult<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE topic_id = $1 ORDER BY created_at ASC OFFSET $2 LIMIT $3",
            POST_COLUMNS
        );
        let records = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(topic_id)
            .bind(to_i64(skip))
            .bind(to_i64(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(records.into_iter().map(PostRecord::to_domain).collect())
    }

    async fn count_posts_in_topic(&self, topic_id: Uuid) -> PortResult<u64> {
        self.count("SELECT COUNT(*) FROM posts WHERE topic_id = $1", Some(topic_id))
            .await
    }

    async fn first_post_in_topic(&self, topic_id: Uuid) -> PortResult<Option<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE topic_id = $1 ORDER BY created_at ASC LIMIT 1",
            POST_COLUMNS
        );
        let record = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(record.map(PostRecord::to_domain))
    }

    async fn latest_post_in_topic(&self, topic_id: Uuid) -> PortResult<Option<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE topic_id = $1 ORDER BY created_at DESC LIMIT 1",
            POST_COLUMNS
        );
        let record = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(record.map(PostRecord::to_domain))
    }

    async fn count_replies_to(&self, post_id: Uuid) -> PortResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM posts WHERE reply_to = $1 AND id <> reply_to",
            Some(post_id),
        )
        .await
    }

    async fn delete_posts_in_topic(&self, topic_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE topic_id = $1")
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected())
    }

    async fn count_posts_by_author(&self, author_id: Uuid) -> PortResult<u64> {
        self.count("SELECT COUNT(*) FROM posts WHERE author_id = $1", Some(author_id))
            .await
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE posts SET likes = array_append(likes, $2) WHERE id = $1 AND NOT ($2 = ANY(likes))",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE posts SET likes = array_remove(likes, $2) WHERE id = $1 AND $2 = ANY(likes)",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    // --- Notifications ---

    async fn insert_notification(&self, n: &Notification) -> PortResult<()> {
        let sql = format!(
            "INSERT INTO notifications ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            NOTIFICATION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(n.id)
            .bind(n.user_id)
            .bind(n.actor_id)
            .bind(n.kind.as_str())
            .bind(&n.title)
            .bind(&n.message)
            .bind(n.read)
            .bind(&n.target_url)
            .bind(n.topic_id)
            .bind(n.post_id)
            .bind(n.created_at)
            .bind(n.updated_at)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: Uuid, skip: u64, limit: u64) -> PortResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC OFFSET $2 LIMIT $3",
            NOTIFICATION_COLUMNS
        );
        sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(user_id)
            .bind(to_i64(skip))
            .bind(to_i64(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?
            .into_iter()
            .map(NotificationRecord::to_domain)
            .collect()
    }

    async fn count_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        self.count("SELECT COUNT(*) FROM notifications WHERE user_id = $1", Some(user_id))
            .await
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read",
            Some(user_id),
        )
        .await
    }

    async fn mark_notifications_read(&self, user_id: Uuid, ids: Option<&[Uuid]>) -> PortResult<u64> {
        let result = match ids {
            Some(ids) => sqlx::query(
                "UPDATE notifications SET read = TRUE, updated_at = NOW() \
                 WHERE user_id = $1 AND NOT read AND id = ANY($2)",
            )
            .bind(user_id)
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await,
            None => sqlx::query(
                "UPDATE notifications SET read = TRUE, updated_at = NOW() WHERE user_id = $1 AND NOT read",
            )
            .bind(user_id)
            .execute(&self.pool)
            .await,
        }
        .map_err(map_err)?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected())
    }

    async fn delete_all_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected())
    }
}
