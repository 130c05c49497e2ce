use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

/// A message as seen by one viewer. Bodies are plaintext at this
/// layer; at-rest encoding is handled below the domain boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub body: String,
    pub message_index: i64,
    pub reply_to_message_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// One inbox entry: the other participant of a direct thread, the
/// latest message, and how many messages the viewer has not read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: i64,
    pub other_user_id: Uuid,
    pub other_username: String,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendStatus {
    None,
    PendingSent,
    PendingReceived,
    Friends,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub from_username: Option<String>,
    pub related_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
