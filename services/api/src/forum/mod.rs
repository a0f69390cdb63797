//! services/api/src/forum/mod.rs
//!
//! The content repository (users, categories, topics, posts) and the
//! notification pipeline, written against the `ForumStore` port.

pub mod categories;
pub mod notifications;
pub mod posts;
pub mod topics;
pub mod users;
pub mod views;

use forum_core::domain::{Notification, User};
use forum_core::ports::{ForumStore, PortResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::TokenService;

pub use categories::CategoryRepository;
pub use notifications::NotificationPipeline;
pub use posts::PostRepository;
pub use topics::TopicRepository;
pub use users::UserRepository;

/// How many documents a single page join fetches concurrently.
pub const JOIN_CONCURRENCY: usize = 8;

/// All repositories, wired to one injected store handle.
#[derive(Clone)]
pub struct Forum {
    pub users: UserRepository,
    pub categories: CategoryRepository,
    pub topics: TopicRepository,
    pub posts: PostRepository,
    pub notifications: NotificationPipeline,
}

impl Forum {
    pub fn new(store: Arc<dyn ForumStore>, tokens: TokenService) -> Self {
        let notifications = NotificationPipeline::new(store.clone());
        Self {
            users: UserRepository::new(store.clone(), tokens, notifications.clone()),
            categories: CategoryRepository::new(store.clone()),
            topics: TopicRepository::new(store.clone()),
            posts: PostRepository::new(store, notifications.clone()),
            notifications,
        }
    }
}

/// Fetches each distinct user once, at most `JOIN_CONCURRENCY` at a time.
/// Ids that no longer resolve are simply absent from the map.
pub(crate) async fn load_users(
    store: &Arc<dyn ForumStore>,
    ids: impl IntoIterator<Item = Uuid>,
) -> PortResult<HashMap<Uuid, User>> {
    let mut unique: Vec<Uuid> = Vec::new();
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }

    let users: Vec<Option<User>> = stream::iter(unique)
        .map(|id| {
            let store = store.clone();
            async move { store.find_user(id).await }
        })
        .buffered(JOIN_CONCURRENCY)
        .try_collect()
        .await?;

    Ok(users.into_iter().flatten().map(|u| (u.id, u)).collect())
}

/// Logs the outcome of a best-effort notification and discards it.
pub(crate) fn log_side_effect(action: &str, result: PortResult<Option<Notification>>) {
    match result {
        Ok(Some(notification)) => debug!(
            "Created {} notification {} for user {}",
            action, notification.id, notification.user_id
        ),
        Ok(None) => debug!("Suppressed {} notification", action),
        Err(e) => warn!("Failed to create {} notification: {}", action, e),
    }
}
