//! services/api/src/forum/notifications.rs
//!
//! The notification pipeline: turns content actions into recipient-visible
//! notification documents and serves each user's feed back to them.
//!
//! Every `notify_*` method returns `Ok(None)` when the notification is
//! suppressed (self-action, unknown recipient, or recipient preferences).
//! Callers treat errors as best-effort failures: log them and move on.

use chrono::Utc;
use forum_core::domain::{Notification, NotificationKind, Role, User};
use forum_core::pagination::{PageRequest, Pagination};
use forum_core::ports::{ForumStore, PortError, PortResult};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::forum::load_users;
use crate::forum::views::{NotificationFeed, NotificationView};

/// What a notification says and where it points, before it has a recipient.
struct Draft {
    kind: NotificationKind,
    actor_id: Option<Uuid>,
    title: String,
    message: String,
    target_url: Option<String>,
    topic_id: Option<Uuid>,
    post_id: Option<Uuid>,
}

impl Draft {
    fn addressed_to(self, user_id: Uuid) -> Notification {
        let now = Utc::now();
        Notification {
            id: Uuid::new_v4(),
            user_id,
            actor_id: self.actor_id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            read: false,
            target_url: self.target_url,
            topic_id: self.topic_id,
            post_id: self.post_id,
            created_at: now,
            updated_at: now,
        }
    }
}

fn post_link(topic_slug: &str, post_id: Uuid) -> String {
    format!("/topics/{}#post-{}", topic_slug, post_id)
}

fn require<T>(value: Option<T>, what: &str, id: Uuid) -> PortResult<T> {
    value.ok_or_else(|| PortError::NotFound(format!("{} {} not found", what, id)))
}

fn role_change_draft(admin_id: Uuid, new_role: Role) -> Draft {
    Draft {
        kind: NotificationKind::RoleChange,
        actor_id: Some(admin_id),
        title: "Role updated".to_string(),
        message: format!("Your role has been changed to {}", new_role),
        target_url: Some("/profile".to_string()),
        topic_id: None,
        post_id: None,
    }
}

/// Builds the role-change notice that moderation paths insert directly.
pub fn role_change_notification(user_id: Uuid, admin_id: Uuid, new_role: Role) -> Notification {
    role_change_draft(admin_id, new_role).addressed_to(user_id)
}

#[derive(Clone)]
pub struct NotificationPipeline {
    store: Arc<dyn ForumStore>,
}

impl NotificationPipeline {
    pub fn new(store: Arc<dyn ForumStore>) -> Self {
        Self { store }
    }

    /// Inserts `draft` for `recipient` unless it is self-inflicted or muted.
    async fn deliver(&self, recipient: &User, draft: Draft) -> PortResult<Option<Notification>> {
        if draft.actor_id == Some(recipient.id) {
            return Ok(None);
        }
        if !recipient.settings.allows(draft.kind) {
            debug!(
                "User {} has muted {} notifications",
                recipient.id, draft.kind
            );
            return Ok(None);
        }
        let notification = draft.addressed_to(recipient.id);
        self.store.insert_notification(&notification).await?;
        Ok(Some(notification))
    }

    //=====================================================================================
    // Fan-out
    //=====================================================================================

    pub async fn notify_reply(
        &self,
        original_post_id: Uuid,
        reply_post_id: Uuid,
    ) -> PortResult<Option<Notification>> {
        let reply = require(self.store.find_post(reply_post_id).await?, "Post", reply_post_id)?;
        let original = require(
            self.store.find_post(original_post_id).await?,
            "Post",
            original_post_id,
        )?;
        if reply.author_id == original.author_id {
            return Ok(None);
        }
        let topic = require(self.store.find_topic(reply.topic_id).await?, "Topic", reply.topic_id)?;
        let replier = require(self.store.find_user(reply.author_id).await?, "User", reply.author_id)?;
        let Some(recipient) = self.store.find_user(original.author_id).await? else {
            return Ok(None);
        };

        let draft = Draft {
            kind: NotificationKind::Reply,
            actor_id: Some(replier.id),
            title: "New reply".to_string(),
            message: format!(
                "{} replied to your post in \"{}\"",
                replier.username, topic.title
            ),
            target_url: Some(post_link(&topic.slug, reply.id)),
            topic_id: Some(topic.id),
            post_id: Some(reply.id),
        };
        self.deliver(&recipient, draft).await
    }

    pub async fn notify_mention(&self, username: &str, post_id: Uuid) -> PortResult<Option<Notification>> {
        let Some(mentioned) = self.store.find_user_by_username(username).await? else {
            return Ok(None);
        };
        let post = require(self.store.find_post(post_id).await?, "Post", post_id)?;
        if mentioned.id == post.author_id {
            return Ok(None);
        }
        let topic = require(self.store.find_topic(post.topic_id).await?, "Topic", post.topic_id)?;
        let actor = require(self.store.find_user(post.author_id).await?, "User", post.author_id)?;

        let draft = Draft {
            kind: NotificationKind::Mention,
            actor_id: Some(actor.id),
            title: "You were mentioned".to_string(),
            message: format!("{} mentioned you in \"{}\"", actor.username, topic.title),
            target_url: Some(post_link(&topic.slug, post.id)),
            topic_id: Some(topic.id),
            post_id: Some(post.id),
        };
        self.deliver(&mentioned, draft).await
    }

    pub async fn notify_like(&self, post_id: Uuid, liker_id: Uuid) -> PortResult<Option<Notification>> {
        let post = require(self.store.find_post(post_id).await?, "Post", post_id)?;
        if post.author_id == liker_id {
            return Ok(None);
        }
        let topic = require(self.store.find_topic(post.topic_id).await?, "Topic", post.topic_id)?;
        let liker = require(self.store.find_user(liker_id).await?, "User", liker_id)?;
        let Some(recipient) = self.store.find_user(post.author_id).await? else {
            return Ok(None);
        };

        let draft = Draft {
            kind: NotificationKind::Like,
            actor_id: Some(liker.id),
            title: "New like".to_string(),
            message: format!("{} liked your post in \"{}\"", liker.username, topic.title),
            target_url: Some(post_link(&topic.slug, post.id)),
            topic_id: Some(topic.id),
            post_id: Some(post.id),
        };
        self.deliver(&recipient, draft).await
    }

    pub async fn notify_topic_reply(
        &self,
        topic_id: Uuid,
        post_id: Uuid,
        replier_id: Uuid,
    ) -> PortResult<Option<Notification>> {
        let topic = require(self.store.find_topic(topic_id).await?, "Topic", topic_id)?;
        if topic.author_id == replier_id {
            return Ok(None);
        }
        let replier = require(self.store.find_user(replier_id).await?, "User", replier_id)?;
        let Some(recipient) = self.store.find_user(topic.author_id).await? else {
            return Ok(None);
        };

        let draft = Draft {
            kind: NotificationKind::TopicReply,
            actor_id: Some(replier.id),
            title: "New reply to your topic".to_string(),
            message: format!(
                "{} replied to your topic \"{}\"",
                replier.username, topic.title
            ),
            target_url: Some(post_link(&topic.slug, post_id)),
            topic_id: Some(topic.id),
            post_id: Some(post_id),
        };
        self.deliver(&recipient, draft).await
    }

    pub async fn notify_role_change(
        &self,
        user_id: Uuid,
        admin_id: Uuid,
        new_role: Role,
    ) -> PortResult<Option<Notification>> {
        let recipient = require(self.store.find_user(user_id).await?, "User", user_id)?;
        self.deliver(&recipient, role_change_draft(admin_id, new_role)).await
    }

    //=====================================================================================
    // Feed
    //=====================================================================================

    pub async fn get_notifications(&self, user_id: Uuid, page: PageRequest) -> PortResult<NotificationFeed> {
        let rows = self
            .store
            .list_notifications(user_id, page.skip(), page.limit())
            .await?;
        let total = self.store.count_notifications(user_id).await?;
        let unread = self.store.count_unread_notifications(user_id).await?;
        let actors = load_users(&self.store, rows.iter().filter_map(|n| n.actor_id)).await?;

        let notifications = rows
            .iter()
            .map(|n| NotificationView::new(n, n.actor_id.and_then(|id| actors.get(&id))))
            .collect();
        let pagination = Pagination::new(page, total);
        Ok(NotificationFeed {
            notifications,
            total_notifications: total,
            unread_count: unread,
            current_page: pagination.current_page,
            total_pages: pagination.total_pages,
        })
    }

    /// Marks the listed notifications (or all, when `ids` is empty) as read.
    /// Only the caller's own notifications are ever touched.
    pub async fn mark_as_read(&self, user_id: Uuid, ids: &[Uuid]) -> PortResult<u64> {
        let scope = if ids.is_empty() { None } else { Some(ids) };
        self.store.mark_notifications_read(user_id, scope).await
    }

    pub async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> PortResult<u64> {
        self.store.delete_notification(id, user_id).await
    }

    pub async fn delete_all_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        self.store.delete_all_notifications(user_id).await
    }
}
