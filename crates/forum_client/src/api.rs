//! The slice of the forum HTTP API that the client state layer drives.

use async_trait::async_trait;
use forum_core::domain::Role;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::models::{
    Account, AuthSession, DeletedCount, ErrorBody, FeedPage, LoginCredentials, ModifiedCount,
    Registration,
};

#[async_trait]
pub trait ForumApi: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> ClientResult<AuthSession>;
    async fn register(&self, registration: &Registration) -> ClientResult<AuthSession>;
    async fn me(&self, token: &str) -> ClientResult<Account>;
    async fn refresh_token(&self, token: &str) -> ClientResult<AuthSession>;

    async fn notifications(&self, token: &str, page: u32, limit: u32) -> ClientResult<FeedPage>;
    /// An empty `ids` slice marks everything read.
    async fn mark_read(&self, token: &str, ids: &[Uuid]) -> ClientResult<u64>;
    async fn delete_notification(&self, token: &str, id: Uuid) -> ClientResult<u64>;
    async fn delete_all_notifications(&self, token: &str) -> ClientResult<u64>;

    async fn set_role(&self, token: &str, user_id: Uuid, role: Role) -> ClientResult<Account>;
}

/// `ForumApi` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpForumApi {
    client: Client,
    base_url: String,
}

impl HttpForumApi {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/api{}", self.base_url, path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Request failed").to_string());
        debug!("API call failed with {}: {}", status, message);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ForumApi for HttpForumApi {
    async fn login(&self, credentials: &LoginCredentials) -> ClientResult<AuthSession> {
        self.send(self.request(Method::POST, "/auth/login", None).json(credentials))
            .await
    }

    async fn register(&self, registration: &Registration) -> ClientResult<AuthSession> {
        self.send(
            self.request(Method::POST, "/auth/register", None)
                .json(registration),
        )
        .await
    }

    async fn me(&self, token: &str) -> ClientResult<Account> {
        self.send(self.request(Method::GET, "/auth/me", Some(token)))
            .await
    }

    async fn refresh_token(&self, token: &str) -> ClientResult<AuthSession> {
        self.send(self.request(Method::POST, "/auth/refresh-token", Some(token)))
            .await
    }

    async fn notifications(&self, token: &str, page: u32, limit: u32) -> ClientResult<FeedPage> {
        self.send(
            self.request(Method::GET, "/notifications", Some(token))
                .query(&[("page", page), ("limit", limit)]),
        )
        .await
    }

    async fn mark_read(&self, token: &str, ids: &[Uuid]) -> ClientResult<u64> {
        let result: ModifiedCount = self
            .send(
                self.request(Method::POST, "/notifications/mark-read", Some(token))
                    .json(&json!({ "notificationIds": ids })),
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn delete_notification(&self, token: &str, id: Uuid) -> ClientResult<u64> {
        let result: DeletedCount = self
            .send(self.request(Method::DELETE, &format!("/notifications/{}", id), Some(token)))
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_all_notifications(&self, token: &str) -> ClientResult<u64> {
        let result: DeletedCount = self
            .send(self.request(Method::DELETE, "/notifications", Some(token)))
            .await?;
        Ok(result.deleted_count)
    }

    async fn set_role(&self, token: &str, user_id: Uuid, role: Role) -> ClientResult<Account> {
        self.send(
            self.request(Method::PUT, &format!("/users/{}/role", user_id), Some(token))
                .json(&json!({ "role": role })),
        )
        .await
    }
}
