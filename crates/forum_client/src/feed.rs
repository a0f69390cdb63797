//! A cached notification feed. Local edits land first and the server is told
//! second; a failed server call is only logged, since the next poll replaces
//! the cache with the server's view anyway.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::ForumApi;
use crate::error::ClientResult;
use crate::models::{FeedPage, NotificationItem};
use crate::session::{AuthPolicy, SessionManager};

pub const POLL_INTERVAL: Duration = Duration::from_secs(30);
const FEED_PAGE_SIZE: u32 = 20;

/// What the UI renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub notifications: Vec<NotificationItem>,
    pub unread_count: u64,
    pub total_notifications: u64,
}

impl From<FeedPage> for FeedSnapshot {
    fn from(page: FeedPage) -> Self {
        Self {
            notifications: page.notifications,
            unread_count: page.unread_count,
            total_notifications: page.total_notifications,
        }
    }
}

pub struct NotificationCenter {
    session: Arc<SessionManager>,
    api: Arc<dyn ForumApi>,
    cache: RwLock<FeedSnapshot>,
}

impl NotificationCenter {
    pub fn new(session: Arc<SessionManager>, api: Arc<dyn ForumApi>) -> Self {
        Self {
            session,
            api,
            cache: RwLock::new(FeedSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        self.cache.read().await.clone()
    }

    pub async fn unread_count(&self) -> u64 {
        self.cache.read().await.unread_count
    }

    /// Drops everything cached, e.g. after sign-out.
    pub async fn reset(&self) {
        *self.cache.write().await = FeedSnapshot::default();
    }

    /// Replaces the cache with the first page from the server.
    pub async fn refresh(&self) -> ClientResult<()> {
        let api = self.api.clone();
        let page = self
            .session
            .call(AuthPolicy::TeardownOn401, move |token| {
                let api = api.clone();
                async move { api.notifications(&token, 1, FEED_PAGE_SIZE).await }
            })
            .await?;
        *self.cache.write().await = page.into();
        Ok(())
    }

    /// Marks `ids` read, or everything when `ids` is empty.
    pub async fn mark_read(&self, ids: &[Uuid]) {
        {
            let mut cache = self.cache.write().await;
            let mut changed = 0;
            for item in cache.notifications.iter_mut() {
                if !item.read && (ids.is_empty() || ids.contains(&item.id)) {
                    item.read = true;
                    changed += 1;
                }
            }
            cache.unread_count = if ids.is_empty() {
                0
            } else {
                cache.unread_count.saturating_sub(changed)
            };
        }

        let api = self.api.clone();
        let ids = ids.to_vec();
        let result = self
            .session
            .call(AuthPolicy::TeardownOn401, move |token| {
                let api = api.clone();
                let ids = ids.clone();
                async move { api.mark_read(&token, &ids).await }
            })
            .await;
        match result {
            Ok(modified) => debug!("Server marked {} notifications read", modified),
            Err(e) => warn!("Failed to mark notifications read: {}", e),
        }
    }

    pub async fn delete(&self, id: Uuid) {
        {
            let mut cache = self.cache.write().await;
            if let Some(pos) = cache.notifications.iter().position(|n| n.id == id) {
                let removed = cache.notifications.remove(pos);
                if !removed.read {
                    cache.unread_count = cache.unread_count.saturating_sub(1);
                }
                cache.total_notifications = cache.total_notifications.saturating_sub(1);
            }
        }

        let api = self.api.clone();
        let result = self
            .session
            .call(AuthPolicy::TeardownOn401, move |token| {
                let api = api.clone();
                async move { api.delete_notification(&token, id).await }
            })
            .await;
        if let Err(e) = result {
            warn!("Failed to delete notification {}: {}", id, e);
        }
    }

    pub async fn clear_all(&self) {
        self.reset().await;

        let api = self.api.clone();
        let result = self
            .session
            .call(AuthPolicy::TeardownOn401, move |token| {
                let api = api.clone();
                async move { api.delete_all_notifications(&token).await }
            })
            .await;
        if let Err(e) = result {
            warn!("Failed to clear notifications: {}", e);
        }
    }

    /// Polls every `POLL_INTERVAL` while signed in.
    pub fn start_polling(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        self.start_polling_every(POLL_INTERVAL, cancel)
    }

    /// Refreshes immediately and then once per `period` until `cancel` fires
    /// or the session ends.
    pub fn start_polling_every(self: &Arc<Self>, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let center = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Notification polling cancelled.");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !center.session.is_authenticated().await {
                            info!("Signed out; notification polling stopped.");
                            center.reset().await;
                            break;
                        }
                        if let Err(e) = center.refresh().await {
                            warn!("Notification poll failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}
