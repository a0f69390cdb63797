//! Credential service: password hashing, bearer tokens and the caller identity
//! that the auth middleware attaches to each request.

pub mod password;
pub mod token;

use forum_core::domain::Role;
use uuid::Uuid;

use crate::error::ApiError;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};

/// The authenticated caller, decoded from the bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require_role(&self, required: Role) -> Result<(), ApiError> {
        if self.role.has_at_least(required) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "This action requires the {} role",
                required
            )))
        }
    }

    /// Owners may always act; everyone else needs a moderating role.
    pub fn can_moderate(&self, owner_id: Uuid) -> bool {
        self.id == owner_id || self.role.has_at_least(Role::Teacher)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  xyz "), Some("xyz"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn moderation_rules() {
        let owner = Uuid::new_v4();
        let student = AuthUser {
            id: Uuid::new_v4(),
            username: "s".into(),
            email: "s@x.test".into(),
            role: Role::Student,
        };
        assert!(!student.can_moderate(owner));
        assert!(student.require_role(Role::Teacher).is_err());
        let teacher = AuthUser { role: Role::Teacher, ..student.clone() };
        assert!(teacher.can_moderate(owner));
        assert!(teacher.require_role(Role::Teacher).is_ok());
        assert!(teacher.require_role(Role::Admin).is_err());
    }
}
