//! The signed-in session: token, cached account, persistence, and what to do
//! when the server stops accepting the token.

use forum_core::domain::Role;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::ForumApi;
use crate::error::{ClientError, ClientResult};
use crate::models::{Account, AuthSession, LoginCredentials, Registration};
use crate::storage::SessionStorage;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Reads a role string from the server, treating anything unknown as a student.
pub fn normalize_role(raw: &str) -> Role {
    raw.parse().unwrap_or_else(|_| {
        debug!("Unknown role '{}', treating as student", raw);
        Role::Student
    })
}

/// How a call reacts to a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Ordinary endpoints: the session is over.
    TeardownOn401,
    /// Auth-sensitive and admin mutations: refresh the token once and retry.
    RefreshAndRetry,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<Account>,
}

pub struct SessionManager {
    api: Arc<dyn ForumApi>,
    storage: Arc<dyn SessionStorage>,
    state: RwLock<SessionState>,
}

impl SessionManager {
    /// Rebuilds the session from storage. A cached account that no longer
    /// parses wipes the stored session and starts anonymous.
    pub fn restore(api: Arc<dyn ForumApi>, storage: Arc<dyn SessionStorage>) -> ClientResult<Self> {
        let token = storage.get(TOKEN_KEY)?;
        let user = match storage.get(USER_KEY)? {
            Some(raw) => match serde_json::from_str::<Account>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Discarding malformed stored session: {}", e);
                    storage.remove(TOKEN_KEY)?;
                    storage.remove(USER_KEY)?;
                    return Ok(Self::anonymous(api, storage));
                }
            },
            None => None,
        };
        let state = match (token, user) {
            (Some(token), Some(user)) => SessionState {
                token: Some(token),
                user: Some(user),
            },
            (None, None) => SessionState::default(),
            // Half a session is no session.
            _ => {
                warn!("Discarding incomplete stored session");
                storage.remove(TOKEN_KEY)?;
                storage.remove(USER_KEY)?;
                SessionState::default()
            }
        };
        Ok(Self {
            api,
            storage,
            state: RwLock::new(state),
        })
    }

    fn anonymous(api: Arc<dyn ForumApi>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            api,
            storage,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.token.is_some()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn user(&self) -> Option<Account> {
        self.state.read().await.user.clone()
    }

    pub async fn has_role(&self, required: Role) -> bool {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .map(|u| u.role.has_at_least(required))
            .unwrap_or(false)
    }

    async fn persist(&self, session: AuthSession) -> ClientResult<()> {
        self.storage.set(TOKEN_KEY, &session.token)?;
        self.storage.set(USER_KEY, &serde_json::to_string(&session.user)?)?;
        let mut state = self.state.write().await;
        state.token = Some(session.token);
        state.user = Some(session.user);
        Ok(())
    }

    async fn establish(&self, session: AuthSession) -> ClientResult<Account> {
        self.persist(session).await?;
        match self.refresh_profile().await {
            Ok(user) => Ok(user),
            Err(e) => {
                warn!("Profile fetch after sign-in failed: {}", e);
                self.logout().await;
                Err(e)
            }
        }
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> ClientResult<Account> {
        let session = self.api.login(credentials).await?;
        info!("Signed in as {}", session.user.username);
        self.establish(session).await
    }

    pub async fn register(&self, registration: &Registration) -> ClientResult<Account> {
        let session = self.api.register(registration).await?;
        info!("Registered {}", session.user.username);
        self.establish(session).await
    }

    /// Clears the in-memory session and storage. Storage failures are logged.
    pub async fn logout(&self) {
        *self.state.write().await = SessionState::default();
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!("Failed to clear stored {}: {}", key, e);
            }
        }
    }

    /// Re-reads the account from the server.
    pub async fn refresh_profile(&self) -> ClientResult<Account> {
        let api = self.api.clone();
        let user = self
            .call(AuthPolicy::TeardownOn401, move |token| {
                let api = api.clone();
                async move { api.me(&token).await }
            })
            .await?;
        self.storage.set(USER_KEY, &serde_json::to_string(&user)?)?;
        self.state.write().await.user = Some(user.clone());
        Ok(user)
    }

    /// Runs an authenticated request with the current token, applying `policy`
    /// if the server answers 401.
    pub async fn call<T, F, Fut>(&self, policy: AuthPolicy, request: F) -> ClientResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let token = self.token().await.ok_or(ClientError::NotAuthenticated)?;
        match request(token.clone()).await {
            Err(e) if e.is_unauthorized() => match policy {
                AuthPolicy::TeardownOn401 => {
                    info!("Token rejected, signing out");
                    self.logout().await;
                    Err(ClientError::SessionExpired)
                }
                AuthPolicy::RefreshAndRetry => self.refresh_and_retry(&token, request).await,
            },
            other => other,
        }
    }

    async fn refresh_and_retry<T, F, Fut>(&self, stale: &str, request: F) -> ClientResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let session = match self.api.refresh_token(stale).await {
            Ok(session) => session,
            Err(e) => {
                info!("Token refresh failed ({}), signing out", e);
                self.logout().await;
                return Err(ClientError::SessionExpired);
            }
        };
        let fresh = session.token.clone();
        self.persist(session).await?;
        match request(fresh).await {
            Err(e) if e.is_unauthorized() => {
                self.logout().await;
                Err(ClientError::SessionExpired)
            }
            other => other,
        }
    }

    /// Admin mutation; retried once with a refreshed token on 401.
    pub async fn set_role(&self, user_id: Uuid, role: Role) -> ClientResult<Account> {
        let api = self.api.clone();
        self.call(AuthPolicy::RefreshAndRetry, move |token| {
            let api = api.clone();
            async move { api.set_role(&token, user_id, role).await }
        })
        .await
    }
}
