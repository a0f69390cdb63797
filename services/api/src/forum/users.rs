//! services/api/src/forum/users.rs
//!
//! Accounts: registration, login, profiles and role management.

use chrono::Utc;
use forum_core::domain::{Identifier, NotificationSettings, Role, User};
use forum_core::pagination::{PageRequest, Paginated};
use forum_core::ports::ForumStore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{hash_password, password::validate_new_password, verify_password, AuthUser, TokenService};
use crate::error::{ApiError, ApiResult};
use crate::forum::notifications::{role_change_notification, NotificationPipeline};
use crate::forum::log_side_effect;
use crate::forum::views::{AuthResponse, ProfileView, PublicUserView, SettingsView, UserView};

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email address.
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub settings: Option<SettingsView>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleChange {
    #[schema(value_type = String)]
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    #[schema(value_type = Option<String>)]
    pub role: Option<Role>,
}

//=========================================================================================
// Validation helpers
//=========================================================================================

fn validate_username(username: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if !(3..=30).contains(&len) {
        return Err(ApiError::Validation(
            "Username must be between 3 and 30 characters".to_string(),
        ));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ApiError::Validation(
            "Username may only contain letters, digits and underscores".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> ApiResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::Validation("A valid email address is required".to_string())),
    }
}

fn default_avatar(username: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random",
        username
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

//=========================================================================================
// Repository
//=========================================================================================

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn ForumStore>,
    tokens: TokenService,
    notifier: NotificationPipeline,
}

impl UserRepository {
    pub fn new(store: Arc<dyn ForumStore>, tokens: TokenService, notifier: NotificationPipeline) -> Self {
        Self {
            store,
            tokens,
            notifier,
        }
    }

    async fn load(&self, id: Uuid) -> ApiResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    fn session_for(&self, user: &User) -> ApiResult<AuthResponse> {
        Ok(AuthResponse {
            token: self.tokens.issue(user)?,
            user: UserView::from(user),
        })
    }

    pub async fn register(&self, req: RegisterRequest) -> ApiResult<AuthResponse> {
        let username = req.username.trim().to_string();
        let email = req.email.trim().to_lowercase();
        validate_username(&username)?;
        validate_email(&email)?;
        validate_new_password(&req.password)?;

        if self.store.find_user_by_username(&username).await?.is_some() {
            return Err(ApiError::Conflict("Username is already taken".to_string()));
        }
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict("Email is already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            display_name: non_empty(req.display_name).unwrap_or_else(|| username.clone()),
            avatar: Some(default_avatar(&username)),
            username,
            email,
            password_hash: hash_password(&req.password)?,
            role: Role::Student,
            bio: None,
            settings: NotificationSettings::default(),
            created_at: now,
            updated_at: now,
            last_active: now,
        };
        // The store enforces uniqueness as well, for registrations that race.
        self.store.insert_user(&user).await?;
        info!("Registered user {} ({})", user.username, user.id);
        self.session_for(&user)
    }

    pub async fn login(&self, req: LoginRequest) -> ApiResult<AuthResponse> {
        let login = req.login.trim();
        let found = if login.contains('@') {
            self.store.find_user_by_email(&login.to_lowercase()).await?
        } else {
            self.store.find_user_by_username(login).await?
        };
        let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
        let mut user = found.ok_or_else(invalid)?;
        if !verify_password(&req.password, &user.password_hash)? {
            return Err(invalid());
        }

        user.last_active = Utc::now();
        self.store.touch_user(user.id, user.last_active).await?;
        self.session_for(&user)
    }

    pub async fn me(&self, auth: &AuthUser) -> ApiResult<UserView> {
        Ok(UserView::from(&self.load(auth.id).await?))
    }

    /// Reissues a token from the stored account, picking up role changes.
    pub async fn refresh_token(&self, auth: &AuthUser) -> ApiResult<AuthResponse> {
        let user = self
            .store
            .find_user(auth.id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;
        self.store.touch_user(user.id, Utc::now()).await?;
        self.session_for(&user)
    }

    pub async fn list_users(&self, auth: &AuthUser, page: PageRequest) -> ApiResult<Paginated<UserView>> {
        auth.require_role(Role::Teacher)?;
        let users = self.store.list_users(page.skip(), page.limit()).await?;
        let total = self.store.count_users().await?;
        Ok(Paginated::new(users.iter().map(UserView::from).collect(), page, total))
    }

    pub async fn public_users(&self, page: PageRequest) -> ApiResult<Paginated<PublicUserView>> {
        let users = self.store.list_users(page.skip(), page.limit()).await?;
        let total = self.store.count_users().await?;
        Ok(Paginated::new(
            users.iter().map(PublicUserView::from).collect(),
            page,
            total,
        ))
    }

    /// Public profile, looked up by id or by username.
    pub async fn profile(&self, key: &Identifier) -> ApiResult<ProfileView> {
        let user = match key {
            Identifier::ById(id) => self.store.find_user(*id).await?,
            Identifier::BySlug(username) => self.store.find_user_by_username(username).await?,
        }
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", key)))?;

        let topic_count = self.store.count_topics_by_author(user.id).await?;
        let post_count = self.store.count_posts_by_author(user.id).await?;
        Ok(ProfileView {
            user: PublicUserView::from(&user),
            topic_count,
            post_count,
        })
    }

    pub async fn update_profile(&self, auth: &AuthUser, req: ProfileUpdate) -> ApiResult<UserView> {
        let mut user = self.load(auth.id).await?;
        if let Some(display_name) = req.display_name {
            let display_name = display_name.trim().to_string();
            if display_name.is_empty() {
                return Err(ApiError::Validation("Display name cannot be empty".to_string()));
            }
            user.display_name = display_name;
        }
        if req.bio.is_some() {
            user.bio = non_empty(req.bio);
        }
        if req.avatar.is_some() {
            user.avatar = non_empty(req.avatar).or_else(|| Some(default_avatar(&user.username)));
        }
        if let Some(settings) = req.settings {
            user.settings = settings.into();
        }
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;
        Ok(UserView::from(&user))
    }

    pub async fn change_password(&self, auth: &AuthUser, req: PasswordChange) -> ApiResult<()> {
        let mut user = self.load(auth.id).await?;
        if !verify_password(&req.current_password, &user.password_hash)? {
            return Err(ApiError::Validation("Current password is incorrect".to_string()));
        }
        validate_new_password(&req.new_password)?;
        user.password_hash = hash_password(&req.new_password)?;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;
        info!("User {} changed their password", user.id);
        Ok(())
    }

    /// Dedicated role endpoint. Inserts the role-change notice directly, so an
    /// admin changing their own role still receives one.
    pub async fn set_role(&self, admin: &AuthUser, user_id: Uuid, role: Role) -> ApiResult<UserView> {
        admin.require_role(Role::Admin)?;
        let mut user = self.load(user_id).await?;
        if user.role == role {
            return Ok(UserView::from(&user));
        }
        user.role = role;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;
        info!("Admin {} set role of {} to {}", admin.id, user.id, role);

        let notice = role_change_notification(user.id, admin.id, role);
        if let Err(e) = self.store.insert_notification(&notice).await {
            warn!("Failed to create role_change notification: {}", e);
        }
        Ok(UserView::from(&user))
    }

    /// General admin edit. A role change here goes through the pipeline.
    pub async fn admin_update_user(
        &self,
        admin: &AuthUser,
        user_id: Uuid,
        req: AdminUserUpdate,
    ) -> ApiResult<UserView> {
        admin.require_role(Role::Admin)?;
        let mut user = self.load(user_id).await?;
        if let Some(display_name) = non_empty(req.display_name) {
            user.display_name = display_name;
        }
        if req.bio.is_some() {
            user.bio = non_empty(req.bio);
        }
        if req.avatar.is_some() {
            user.avatar = non_empty(req.avatar).or_else(|| Some(default_avatar(&user.username)));
        }
        let role_changed = match req.role {
            Some(role) if role != user.role => {
                user.role = role;
                true
            }
            _ => false,
        };
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        if role_changed {
            let result = self
                .notifier
                .notify_role_change(user.id, admin.id, user.role)
                .await;
            log_side_effect("role_change", result);
        }
        Ok(UserView::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_must_be_word_characters() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username("alice-smith").is_err());
    }

    #[test]
    fn emails_need_a_domain() {
        assert!(validate_email("alice@x.test").is_ok());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@x.test").is_err());
        assert!(validate_email("alice@localhost").is_err());
    }
}
