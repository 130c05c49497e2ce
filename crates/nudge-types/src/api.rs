use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FriendStatus, MessageView, NotificationView, ThreadSummary, User};

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the auth
/// handlers. Canonical definition lives here in nudge-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// -- Users --

#[derive(Debug, Serialize)]
pub struct UserSearchResponse {
    pub count: usize,
    pub users: Vec<User>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub to_user: String,
    pub body: String,
    pub reply_to_message_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub thread_id: i64,
    pub message_id: i64,
    pub message_index: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ThreadMessagesResponse {
    pub thread_id: Option<i64>,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub threads: Vec<ThreadSummary>,
}

// -- Friends --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FriendRequestSend {
    pub to_user: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FriendRequestRespond {
    pub request_id: i64,
    pub accept: bool,
}

#[derive(Debug, Serialize)]
pub struct FriendStatusResponse {
    pub status: FriendStatus,
    pub request_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FriendEntry {
    pub user_id: Uuid,
    pub username: String,
    pub active: bool,
    pub friends_since: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct PendingRequestEntry {
    pub request_id: i64,
    pub username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct PendingRequestsResponse {
    pub received: Vec<PendingRequestEntry>,
    pub sent: Vec<PendingRequestEntry>,
}

// -- Invites --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InviteRecipient {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInviteRequest {
    pub recipient1: InviteRecipient,
    pub recipient2: InviteRecipient,
    pub expires_in_hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateInviteResponse {
    pub code: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptInviteRequest {
    pub code: String,
    pub recipient_number: u8,
}

#[derive(Debug, Serialize)]
pub struct AcceptInviteResponse {
    pub both_accepted: bool,
    pub thread_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct InviteStatusResponse {
    pub code: String,
    pub recipient1_accepted: bool,
    pub recipient2_accepted: bool,
    pub thread_id: Option<i64>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkNotificationsRead {
    pub notification_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationView>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}
