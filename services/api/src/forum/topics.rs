//! services/api/src/forum/topics.rs
//!
//! Topics and their denormalized bookkeeping. A topic is created together with
//! its first post; `reply_count` counts the posts after that one and
//! `last_post_id` points at the newest post. Both are maintained by the post
//! operations as separate writes, so `reconcile_topic` exists to repair them
//! if a crash lands between the two.

use chrono::Utc;
use forum_core::domain::{Category, Identifier, Post, Role, Topic, TOMBSTONE};
use forum_core::pagination::{PageRequest, Paginated};
use forum_core::ports::{ForumStore, PortResult};
use forum_core::text::{normalize_tags, topic_slug};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::forum::views::{
    CategorySummary, CreatedTopic, LastPostView, PostView, TopicDetail, TopicView,
};
use crate::forum::{load_users, JOIN_CONCURRENCY};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTopic {
    pub title: String,
    pub content: String,
    /// Category id or slug.
    pub category_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Moves the topic to another category (id or slug).
    pub category_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
    pub is_locked: Option<bool>,
}

fn required(value: &str, field: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Points the topic at its newest remaining post, or back at itself when none remain.
pub(crate) async fn recompute_last_post(store: &Arc<dyn ForumStore>, topic: &Topic) -> PortResult<()> {
    match store.latest_post_in_topic(topic.id).await? {
        Some(post) => store.set_last_post(topic.id, Some(post.id), post.created_at).await,
        None => store.set_last_post(topic.id, None, topic.created_at).await,
    }
}

#[derive(Clone)]
pub struct TopicRepository {
    store: Arc<dyn ForumStore>,
}

impl TopicRepository {
    pub fn new(store: Arc<dyn ForumStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, key: &Identifier) -> ApiResult<Topic> {
        match key {
            Identifier::ById(id) => self.store.find_topic(*id).await?,
            Identifier::BySlug(slug) => self.store.find_topic_by_slug(slug).await?,
        }
        .ok_or_else(|| ApiError::NotFound(format!("Topic {} not found", key)))
    }

    async fn resolve_category(&self, key: &Identifier) -> ApiResult<Category> {
        match key {
            Identifier::ById(id) => self.store.find_category(*id).await?,
            Identifier::BySlug(slug) => self.store.find_category_by_slug(slug).await?,
        }
        .ok_or_else(|| ApiError::NotFound(format!("Category {} not found", key)))
    }

    /// Joins author and last-post information onto a page of topics.
    async fn summarize(&self, topics: Vec<Topic>) -> ApiResult<Vec<TopicView>> {
        let last_posts: Vec<Option<Post>> = stream::iter(topics.iter().map(|t| t.last_post_id).collect::<Vec<_>>())
            .map(|id| {
                let store = self.store.clone();
                async move {
                    match id {
                        Some(id) => store.find_post(id).await,
                        None => Ok(None),
                    }
                }
            })
            .buffered(JOIN_CONCURRENCY)
            .try_collect()
            .await?;

        let author_ids = topics
            .iter()
            .map(|t| t.author_id)
            .chain(last_posts.iter().flatten().map(|p| p.author_id));
        let users = load_users(&self.store, author_ids).await?;

        Ok(topics
            .iter()
            .zip(last_posts)
            .map(|(topic, last)| {
                let last_post = last.map(|p| LastPostView {
                    id: p.id,
                    created_at: p.created_at,
                    author: users.get(&p.author_id).map(Into::into),
                });
                TopicView::new(topic, users.get(&topic.author_id), last_post)
            })
            .collect())
    }

    async fn view(&self, topic: &Topic) -> ApiResult<TopicView> {
        let mut views = self.summarize(vec![topic.clone()]).await?;
        views
            .pop()
            .ok_or_else(|| ApiError::Internal("Topic summary missing".to_string()))
    }

    pub async fn create_topic(&self, auth: &AuthUser, input: NewTopic) -> ApiResult<CreatedTopic> {
        let title = required(&input.title, "Title")?;
        let content = required(&input.content, "Content")?;
        let category = self.resolve_category(&Identifier::parse(&input.category_id)).await?;
        let author = self
            .store
            .find_user(auth.id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

        let now = Utc::now();
        let mut topic = Topic {
            id: Uuid::new_v4(),
            slug: topic_slug(&title, now),
            title,
            content: content.clone(),
            category_id: category.id,
            author_id: author.id,
            tags: normalize_tags(&input.tags),
            view_count: 0,
            reply_count: 0,
            last_post_id: None,
            last_post_at: now,
            is_pinned: false,
            is_locked: false,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_topic(&topic).await?;

        let post = Post {
            id: Uuid::new_v4(),
            content,
            topic_id: topic.id,
            author_id: author.id,
            reply_to: None,
            is_edited: false,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
            last_edited_at: None,
        };
        if let Err(e) = self.store.insert_post(&post).await {
            // Compensate: a topic must never exist without its first post.
            if let Err(cleanup) = self.store.delete_topic(topic.id).await {
                error!("Failed to roll back topic {}: {}", topic.id, cleanup);
            }
            return Err(e.into());
        }
        self.store
            .set_last_post(topic.id, Some(post.id), post.created_at)
            .await?;
        topic.last_post_id = Some(post.id);
        topic.last_post_at = post.created_at;
        info!("Topic '{}' created by {}", topic.slug, author.id);

        let last_post = Some(LastPostView {
            id: post.id,
            created_at: post.created_at,
            author: Some((&author).into()),
        });
        Ok(CreatedTopic {
            topic: TopicView::new(&topic, Some(&author), last_post),
            post: PostView::new(&post, Some(&author)),
        })
    }

    /// Topic detail. Counts as a view.
    pub async fn get_topic(&self, key: &Identifier) -> ApiResult<TopicDetail> {
        let mut topic = self.resolve(key).await?;
        self.store.increment_view_count(topic.id).await?;
        topic.view_count += 1;

        let category = self.store.find_category(topic.category_id).await?;
        Ok(TopicDetail {
            topic: self.view(&topic).await?,
            category: category.as_ref().map(CategorySummary::from),
        })
    }

    pub async fn latest_topics(&self, page: PageRequest) -> ApiResult<Paginated<TopicView>> {
        let topics = self.store.list_latest_topics(page.skip(), page.limit()).await?;
        let total = self.store.count_topics().await?;
        Ok(Paginated::new(self.summarize(topics).await?, page, total))
    }

    pub async fn topics_in_category(
        &self,
        category: &Identifier,
        page: PageRequest,
    ) -> ApiResult<Paginated<TopicView>> {
        let category = self.resolve_category(category).await?;
        let topics = self
            .store
            .list_topics_in_category(category.id, page.skip(), page.limit())
            .await?;
        let total = self.store.count_topics_in_category(category.id).await?;
        Ok(Paginated::new(self.summarize(topics).await?, page, total))
    }

    pub async fn update_topic(
        &self,
        auth: &AuthUser,
        key: &Identifier,
        update: TopicUpdate,
    ) -> ApiResult<TopicView> {
        let mut topic = self.resolve(key).await?;
        if !auth.can_moderate(topic.author_id) {
            return Err(ApiError::Forbidden(
                "Only the author or a moderator may edit this topic".to_string(),
            ));
        }
        if update.is_pinned.is_some() || update.is_locked.is_some() {
            auth.require_role(Role::Teacher)?;
        }

        let now = Utc::now();
        if let Some(title) = update.title {
            let title = required(&title, "Title")?;
            if title != topic.title {
                topic.slug = topic_slug(&title, now);
                topic.title = title;
            }
        }
        if let Some(raw) = update.category_id {
            topic.category_id = self.resolve_category(&Identifier::parse(&raw)).await?.id;
        }
        if let Some(tags) = update.tags {
            topic.tags = normalize_tags(&tags);
        }
        if let Some(is_pinned) = update.is_pinned {
            topic.is_pinned = is_pinned;
        }
        if let Some(is_locked) = update.is_locked {
            topic.is_locked = is_locked;
        }
        let new_content = match update.content {
            Some(content) => {
                let content = required(&content, "Content")?;
                (content != topic.content).then_some(content)
            }
            None => None,
        };
        if let Some(content) = &new_content {
            topic.content = content.clone();
        }

        topic.updated_at = now;
        self.store.update_topic(&topic).await?;

        // The first post mirrors the topic body unless it has been tombstoned.
        if let Some(content) = new_content {
            let first = self.store.first_post_in_topic(topic.id).await?;
            if let Some(mut first) = first.filter(|p| p.content != TOMBSTONE) {
                first.content = content;
                first.is_edited = true;
                first.updated_at = now;
                first.last_edited_at = Some(now);
                self.store.update_post(&first).await?;
            }
        }
        self.view(&topic).await
    }

    /// Deletes the topic and every post in it. Returns the number of posts removed.
    pub async fn delete_topic(&self, auth: &AuthUser, key: &Identifier) -> ApiResult<u64> {
        let topic = self.resolve(key).await?;
        if !auth.can_moderate(topic.author_id) {
            return Err(ApiError::Forbidden(
                "Only the author or a moderator may delete this topic".to_string(),
            ));
        }
        let removed = self.store.delete_posts_in_topic(topic.id).await?;
        self.store.delete_topic(topic.id).await?;
        info!(
            "Topic {} deleted by {} along with {} posts",
            topic.id, auth.id, removed
        );
        Ok(removed)
    }

    /// Repair tool: recounts the topic's posts and recomputes its last post.
    pub async fn reconcile_topic(&self, auth: &AuthUser, key: &Identifier) -> ApiResult<TopicView> {
        auth.require_role(Role::Admin)?;
        let topic = self.resolve(key).await?;
        let posts = self.store.count_posts_in_topic(topic.id).await? as i64;
        let replies = (posts - 1).max(0);
        self.store.set_reply_count(topic.id, replies).await?;
        recompute_last_post(&self.store, &topic).await?;
        info!(
            "Reconciled topic {}: reply_count {} -> {}",
            topic.id, topic.reply_count, replies
        );
        let topic = self.resolve(&Identifier::ById(topic.id)).await?;
        self.view(&topic).await
    }
}
