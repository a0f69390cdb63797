//! crates/forum_core/src/domain.rs
//!
//! Defines the pure, core data structures of the forum.
//! These structs are independent of any database or HTTP representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

/// Replacement content for a post that is still referenced by replies.
pub const TOMBSTONE: &str = "[This post has been deleted]";

//=========================================================================================
// Roles
//=========================================================================================

/// The closed set of user roles, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl Role {
    /// The single role check used everywhere: does `self` meet `required`?
    pub fn has_at_least(self, required: Role) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(PortError::Validation(format!("Unknown role '{}'", other))),
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

/// Per-user notification preferences. Folded into the user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub site_notifications: bool,
    pub notify_on_replies: bool,
    pub notify_on_mentions: bool,
    pub notify_on_likes: bool,
    pub notify_on_topic_replies: bool,
    pub notify_on_role_changes: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            site_notifications: true,
            notify_on_replies: true,
            notify_on_mentions: true,
            notify_on_likes: true,
            notify_on_topic_replies: true,
            notify_on_role_changes: true,
        }
    }
}

impl NotificationSettings {
    /// Whether an in-site notification of `kind` should be delivered.
    pub fn allows(&self, kind: NotificationKind) -> bool {
        if !self.site_notifications {
            return false;
        }
        match kind {
            NotificationKind::Reply => self.notify_on_replies,
            NotificationKind::Mention => self.notify_on_mentions,
            NotificationKind::Like => self.notify_on_likes,
            NotificationKind::TopicReply => self.notify_on_topic_replies,
            NotificationKind::RoleChange => self.notify_on_role_changes,
            NotificationKind::System => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub settings: NotificationSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

//=========================================================================================
// Taxonomy and content
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub order: i32,
    pub is_active: bool,
    pub parent_category: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub tags: Vec<String>,
    pub view_count: i64,
    /// Number of posts after the first one.
    pub reply_count: i64,
    pub last_post_id: Option<Uuid>,
    pub last_post_at: DateTime<Utc>,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub reply_to: Option<Uuid>,
    pub is_edited: bool,
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_edited_at: Option<DateTime<Utc>>,
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Reply,
    Mention,
    Like,
    TopicReply,
    System,
    RoleChange,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Reply => "reply",
            NotificationKind::Mention => "mention",
            NotificationKind::Like => "like",
            NotificationKind::TopicReply => "topic_reply",
            NotificationKind::System => "system",
            NotificationKind::RoleChange => "role_change",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reply" => Ok(NotificationKind::Reply),
            "mention" => Ok(NotificationKind::Mention),
            "like" => Ok(NotificationKind::Like),
            "topic_reply" => Ok(NotificationKind::TopicReply),
            "system" => Ok(NotificationKind::System),
            "role_change" => Ok(NotificationKind::RoleChange),
            other => Err(PortError::Validation(format!(
                "Unknown notification type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    /// The recipient.
    pub user_id: Uuid,
    /// The user whose action triggered this; `None` for system notices.
    pub actor_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub target_url: Option<String>,
    pub topic_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//=========================================================================================
// Lookup keys
//=========================================================================================

/// A path parameter that may name a document either by id or by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    ById(Uuid),
    BySlug(String),
}

impl Identifier {
    /// Parses the raw value once: anything that is a valid `Uuid` is an id.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Uuid::parse_str(raw) {
            Ok(id) => Identifier::ById(id),
            Err(_) => Identifier::BySlug(raw.to_string()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::ById(id) => write!(f, "{}", id),
            Identifier::BySlug(slug) => f.write_str(slug),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_order_is_total() {
        assert!(Role::Admin.has_at_least(Role::Teacher));
        assert!(Role::Teacher.has_at_least(Role::Teacher));
        assert!(!Role::Student.has_at_least(Role::Teacher));
        assert!(Role::Student.has_at_least(Role::Student));
        assert!(!Role::Teacher.has_at_least(Role::Admin));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" teacher ".parse::<Role>().unwrap(), Role::Teacher);
        assert!("moderator".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
    }

    #[test]
    fn identifier_dispatch() {
        let id = Uuid::new_v4();
        assert_eq!(Identifier::parse(&id.to_string()), Identifier::ById(id));
        assert_eq!(
            Identifier::parse("general-discussion"),
            Identifier::BySlug("general-discussion".to_string())
        );
    }

    #[test]
    fn settings_gate_by_kind() {
        let mut settings = NotificationSettings::default();
        assert!(settings.allows(NotificationKind::Like));
        settings.notify_on_likes = false;
        assert!(!settings.allows(NotificationKind::Like));
        assert!(settings.allows(NotificationKind::Reply));
        settings.site_notifications = false;
        assert!(!settings.allows(NotificationKind::Reply));
    }

    #[test]
    fn notification_kind_round_trips_through_str() {
        for kind in [
            NotificationKind::Reply,
            NotificationKind::Mention,
            NotificationKind::Like,
            NotificationKind::TopicReply,
            NotificationKind::System,
            NotificationKind::RoleChange,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
    }
}
