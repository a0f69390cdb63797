//! services/api/src/forum/posts.rs
//!
//! Replies, edits, deletes and likes. Creating a post updates the topic's
//! counters first and then fans out notifications as a best-effort side effect.

use chrono::Utc;
use forum_core::domain::{Identifier, Post, Role, Topic, TOMBSTONE};
use forum_core::pagination::{PageRequest, Paginated};
use forum_core::ports::ForumStore;
use forum_core::text::extract_mentions;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::forum::notifications::NotificationPipeline;
use crate::forum::topics::recompute_last_post;
use crate::forum::views::{DeletePostResult, LikeResult, PostView};
use crate::forum::{load_users, log_side_effect};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub topic_id: Uuid,
    pub content: String,
    pub reply_to: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostEdit {
    pub content: String,
}

#[derive(Clone)]
pub struct PostRepository {
    store: Arc<dyn ForumStore>,
    notifier: NotificationPipeline,
}

impl PostRepository {
    pub fn new(store: Arc<dyn ForumStore>, notifier: NotificationPipeline) -> Self {
        Self { store, notifier }
    }

    async fn load_post(&self, id: Uuid) -> ApiResult<Post> {
        self.store
            .find_post(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Post {} not found", id)))
    }

    async fn load_topic(&self, id: Uuid) -> ApiResult<Topic> {
        self.store
            .find_topic(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Topic {} not found", id)))
    }

    fn ensure_unlocked(auth: &AuthUser, topic: &Topic) -> ApiResult<()> {
        if topic.is_locked && !auth.role.has_at_least(Role::Teacher) {
            return Err(ApiError::Forbidden("This topic is locked".to_string()));
        }
        Ok(())
    }

    async fn view(&self, post: &Post) -> ApiResult<PostView> {
        let author = self.store.find_user(post.author_id).await?;
        Ok(PostView::new(post, author.as_ref()))
    }

    pub async fn create_post(&self, auth: &AuthUser, input: NewPost) -> ApiResult<PostView> {
        let content = input.content.trim().to_string();
        if content.is_empty() {
            return Err(ApiError::Validation("Content is required".to_string()));
        }
        let topic = self.load_topic(input.topic_id).await?;
        Self::ensure_unlocked(auth, &topic)?;

        let replied = match input.reply_to {
            Some(target) => {
                let original = self.store.find_post(target).await?.ok_or_else(|| {
                    ApiError::NotFound("The post you are replying to does not exist".to_string())
                })?;
                if original.topic_id != topic.id {
                    return Err(ApiError::Validation(
                        "Replies must stay within the same topic".to_string(),
                    ));
                }
                Some(original)
            }
            None => None,
        };
        let author = self
            .store
            .find_user(auth.id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            content,
            topic_id: topic.id,
            author_id: author.id,
            reply_to: replied.as_ref().map(|p| p.id),
            is_edited: false,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
            last_edited_at: None,
        };
        self.store.insert_post(&post).await?;
        self.store.record_reply(topic.id, post.id, post.created_at).await?;

        // Fan-out. Nothing below may fail the request.
        let mut topic_author_notified = false;
        if let Some(original) = &replied {
            let result = self.notifier.notify_reply(original.id, post.id).await;
            topic_author_notified =
                matches!(&result, Ok(Some(n)) if n.user_id == topic.author_id);
            log_side_effect("reply", result);
        }
        // A topic author already told about a direct reply is not told twice.
        if !topic_author_notified {
            let result = self
                .notifier
                .notify_topic_reply(topic.id, post.id, author.id)
                .await;
            log_side_effect("topic_reply", result);
        }
        for username in extract_mentions(&post.content) {
            let result = self.notifier.notify_mention(&username, post.id).await;
            log_side_effect("mention", result);
        }

        Ok(PostView::new(&post, Some(&author)))
    }

    /// Posts of a topic in creation order. The first item on page one is the
    /// topic's opening post.
    pub async fn list_posts(&self, topic: &Identifier, page: PageRequest) -> ApiResult<Paginated<PostView>> {
        let topic = match topic {
            Identifier::ById(id) => self.store.find_topic(*id).await?,
            Identifier::BySlug(slug) => self.store.find_topic_by_slug(slug).await?,
        }
        .ok_or_else(|| ApiError::NotFound(format!("Topic {} not found", topic)))?;

        let posts = self
            .store
            .list_posts_in_topic(topic.id, page.skip(), page.limit())
            .await?;
        let total = self.store.count_posts_in_topic(topic.id).await?;
        let authors = load_users(&self.store, posts.iter().map(|p| p.author_id)).await?;
        let views = posts
            .iter()
            .map(|p| PostView::new(p, authors.get(&p.author_id)))
            .collect();
        Ok(Paginated::new(views, page, total))
    }

    pub async fn update_post(&self, auth: &AuthUser, id: Uuid, edit: PostEdit) -> ApiResult<PostView> {
        let content = edit.content.trim().to_string();
        if content.is_empty() {
            return Err(ApiError::Validation("Content is required".to_string()));
        }
        let mut post = self.load_post(id).await?;
        let mut topic = self.load_topic(post.topic_id).await?;
        if !auth.can_moderate(post.author_id) {
            return Err(ApiError::Forbidden(
                "Only the author or a moderator may edit this post".to_string(),
            ));
        }
        Self::ensure_unlocked(auth, &topic)?;

        let now = Utc::now();
        post.content = content;
        post.is_edited = true;
        post.updated_at = now;
        post.last_edited_at = Some(now);
        self.store.update_post(&post).await?;

        // The opening post and the topic body stay in sync.
        let first = self.store.first_post_in_topic(topic.id).await?;
        if first.map(|p| p.id) == Some(post.id) {
            topic.content = post.content.clone();
            topic.updated_at = now;
            self.store.update_topic(&topic).await?;
        }
        self.view(&post).await
    }

    pub async fn delete_post(&self, auth: &AuthUser, id: Uuid) -> ApiResult<DeletePostResult> {
        let mut post = self.load_post(id).await?;
        let topic = self.load_topic(post.topic_id).await?;
        if !auth.can_moderate(post.author_id) {
            return Err(ApiError::Forbidden(
                "Only the author or a moderator may delete this post".to_string(),
            ));
        }
        Self::ensure_unlocked(auth, &topic)?;

        // Replies still point here: keep the row, drop the content.
        if self.store.count_replies_to(post.id).await? > 0 {
            let now = Utc::now();
            post.content = TOMBSTONE.to_string();
            post.is_edited = true;
            post.updated_at = now;
            post.last_edited_at = Some(now);
            self.store.update_post(&post).await?;
            info!("Post {} tombstoned by {}", post.id, auth.id);
            return Ok(DeletePostResult {
                message: "Post content removed; replies to it are preserved".to_string(),
                soft_deleted: true,
            });
        }

        let first = self.store.first_post_in_topic(topic.id).await?;
        if first.map(|p| p.id) == Some(post.id) {
            return Err(ApiError::Validation(
                "The opening post cannot be deleted on its own; delete the topic instead".to_string(),
            ));
        }

        self.store.delete_post(post.id).await?;
        self.store.decrement_reply_count(topic.id).await?;
        if topic.last_post_id == Some(post.id) {
            recompute_last_post(&self.store, &topic).await?;
        }
        info!("Post {} deleted by {}", post.id, auth.id);
        Ok(DeletePostResult {
            message: "Post deleted".to_string(),
            soft_deleted: false,
        })
    }

    pub async fn toggle_like(&self, auth: &AuthUser, id: Uuid) -> ApiResult<LikeResult> {
        let post = self.load_post(id).await?;
        let liked = if post.likes.contains(&auth.id) {
            self.store.remove_like(post.id, auth.id).await?;
            false
        } else {
            // Only a real unliked -> liked transition notifies.
            if self.store.add_like(post.id, auth.id).await? {
                let result = self.notifier.notify_like(post.id, auth.id).await;
                log_side_effect("like", result);
            }
            true
        };
        let post = self.load_post(id).await?;
        Ok(LikeResult {
            liked,
            like_count: post.likes.len(),
        })
    }
}
