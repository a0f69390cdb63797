//! Signed session tokens (HS256 JWT) carrying the caller's identity and role.

use chrono::{DateTime, Duration, Utc};
use forum_core::domain::{Role, User};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                debug!("Rejected bearer token: {}", e);
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })?;
        let claims = data.claims;
        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_core::domain::NotificationSettings;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.test".into(),
            password_hash: String::new(),
            display_name: "alice".into(),
            role,
            avatar: None,
            bio: None,
            settings: NotificationSettings::default(),
            created_at: now,
            updated_at: now,
            last_active: now,
        }
    }

    #[test]
    fn issued_token_round_trips_identity() {
        let service = TokenService::new("a-very-long-test-secret", 24);
        let alice = user(Role::Teacher);
        let token = service.issue(&alice).unwrap();
        let auth = service.verify(&token).unwrap();
        assert_eq!(auth.id, alice.id);
        assert_eq!(auth.username, "alice");
        assert_eq!(auth.role, Role::Teacher);
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let service = TokenService::new("a-very-long-test-secret", 24);
        let stale = service
            .issue_at(&user(Role::Student), Utc::now() - Duration::hours(48))
            .unwrap();
        assert!(matches!(service.verify(&stale), Err(ApiError::Unauthorized(_))));

        let other = TokenService::new("another-long-test-secret", 24);
        let token = other.issue(&user(Role::Admin)).unwrap();
        assert!(service.verify(&token).is_err());
        assert!(service.verify("garbage").is_err());
    }
}
