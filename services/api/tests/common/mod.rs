//! Shared fixtures: a forum over the in-memory store and helpers to seed it.

#![allow(dead_code)]

pub mod flaky;

use forum_api::adapters::MemoryStore;
use forum_api::auth::{AuthUser, TokenService};
use forum_api::forum::categories::NewCategory;
use forum_api::forum::posts::NewPost;
use forum_api::forum::topics::NewTopic;
use forum_api::forum::users::RegisterRequest;
use forum_api::forum::views::{CreatedTopic, PostView};
use forum_api::forum::Forum;
use forum_core::domain::Role;
use forum_core::ports::ForumStore;
use forum_core::PageRequest;
use std::sync::Arc;
use uuid::Uuid;

use flaky::FlakyStore;

pub const SECRET: &str = "integration-test-secret";

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub tokens: TokenService,
    pub forum: Forum,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let tokens = TokenService::new(SECRET, 24);
    let forum = Forum::new(store.clone(), tokens.clone());
    Fixture {
        store,
        tokens,
        forum,
    }
}

/// A fixture whose repositories write through a `FlakyStore`. `store` still
/// reads the same underlying data.
pub fn fixture_with_faults() -> (Fixture, Arc<FlakyStore>) {
    let store = Arc::new(MemoryStore::new());
    let faults = Arc::new(FlakyStore::new(store.clone()));
    let tokens = TokenService::new(SECRET, 24);
    let forum = Forum::new(faults.clone(), tokens.clone());
    (
        Fixture {
            store,
            tokens,
            forum,
        },
        faults,
    )
}

pub fn first_page() -> PageRequest {
    PageRequest::new(None, None).unwrap()
}

impl Fixture {
    pub async fn register(&self, username: &str) -> AuthUser {
        let session = self
            .forum
            .users
            .register(RegisterRequest {
                username: username.to_string(),
                email: format!("{}@x.test", username),
                password: "secret123".to_string(),
                display_name: None,
            })
            .await
            .unwrap();
        self.tokens.verify(&session.token).unwrap()
    }

    /// Promotes an account directly in the store and returns its new identity.
    pub async fn promote(&self, user: &AuthUser, role: Role) -> AuthUser {
        let mut stored = self.store.find_user(user.id).await.unwrap().unwrap();
        stored.role = role;
        self.store.update_user(&stored).await.unwrap();
        AuthUser {
            role,
            ..user.clone()
        }
    }

    pub async fn category(&self, creator: &AuthUser, name: &str) -> Uuid {
        self.forum
            .categories
            .create_category(
                creator,
                NewCategory {
                    name: name.to_string(),
                    description: None,
                    order: None,
                    is_active: None,
                    parent_category: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    pub async fn topic(&self, author: &AuthUser, category: Uuid, title: &str) -> CreatedTopic {
        self.forum
            .topics
            .create_topic(
                author,
                NewTopic {
                    title: title.to_string(),
                    content: format!("{} body", title),
                    category_id: category.to_string(),
                    tags: Vec::new(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn reply(
        &self,
        author: &AuthUser,
        topic: Uuid,
        content: &str,
        reply_to: Option<Uuid>,
    ) -> PostView {
        self.forum
            .posts
            .create_post(
                author,
                NewPost {
                    topic_id: topic,
                    content: content.to_string(),
                    reply_to,
                },
            )
            .await
            .unwrap()
    }

    pub async fn notification_count(&self, user: &AuthUser) -> u64 {
        self.store.count_notifications(user.id).await.unwrap()
    }
}
