/// Database row types — these map directly to SQLite rows.
/// Distinct from the nudge-types API models to keep the DB layer
/// independent.
use nudge_types::IdSet;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub is_admin: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

pub struct ThreadRow {
    pub id: i64,
    pub is_group: bool,
    pub created_by: String,
    pub pair_key: Option<String>,
    pub hidden_for: IdSet,
    pub created_at: String,
}

pub struct ParticipantRow {
    pub thread_id: i64,
    pub user_id: String,
    pub joined_at: String,
    pub last_read_message_id: Option<i64>,
}

pub struct MessageRow {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: String,
    pub sender_username: String,
    pub body: String,
    pub message_index: i64,
    pub reply_to_message_id: Option<i64>,
    pub deleted_for: IdSet,
    pub created_at: String,
}

pub struct FriendRequestRow {
    pub id: i64,
    pub requester_id: String,
    pub recipient_id: String,
    pub status: String,
    pub created_at: String,
    pub responded_at: Option<String>,
}

pub struct NotificationRow {
    pub id: i64,
    pub user_id: String,
    pub kind: String,
    pub from_user_id: Option<String>,
    pub related_id: Option<i64>,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: String,
}

pub struct InviteRow {
    pub id: i64,
    pub code: String,
    pub recipient1_username: Option<String>,
    pub recipient1_email: Option<String>,
    pub recipient1_phone: Option<String>,
    pub recipient1_accepted: bool,
    pub recipient2_username: Option<String>,
    pub recipient2_email: Option<String>,
    pub recipient2_phone: Option<String>,
    pub recipient2_accepted: bool,
    pub thread_id: Option<i64>,
    pub created_by: String,
    pub created_at: String,
    pub expires_at: Option<String>,
}
