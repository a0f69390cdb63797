//! Wire shapes the client reads from and sends to the forum API.

use chrono::{DateTime, Utc};
use forum_core::domain::{NotificationKind, Role};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::session::normalize_role;

fn lenient_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(normalize_role).unwrap_or_default())
}

/// The signed-in account as cached by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: Account,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    /// Username or email address.
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub actor: Option<Actor>,
    pub target_url: Option<String>,
    pub topic_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One page of `GET /api/notifications`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub notifications: Vec<NotificationItem>,
    pub total_notifications: u64,
    pub unread_count: u64,
    pub current_page: u32,
    pub total_pages: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModifiedCount {
    pub modified_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeletedCount {
    pub deleted_count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_fall_back_to_student() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"id":"{}","username":"alice","email":"a@x.test","displayName":"Alice","role":"superuser"}}"#,
            id
        );
        let account: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(account.role, Role::Student);

        let json = format!(r#"{{"id":"{}","username":"bob","role":"Teacher"}}"#, id);
        let account: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(account.role, Role::Teacher);
    }

    #[test]
    fn notification_kind_reads_from_type() {
        let json = format!(
            r#"{{"id":"{}","type":"topic_reply","title":"t","message":"m","read":false,
                "actor":null,"targetUrl":"/topics/x","topicId":null,"postId":null,
                "createdAt":"2024-01-01T00:00:00Z"}}"#,
            Uuid::new_v4()
        );
        let item: NotificationItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item.kind, NotificationKind::TopicReply);
    }
}
