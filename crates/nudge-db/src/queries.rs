use crate::models::{
    FriendRequestRow, InviteRow, MessageRow, NotificationRow, ParticipantRow, ThreadRow, UserRow,
};
use crate::{Database, now_rfc3339};
use anyhow::Result;
use nudge_types::IdSet;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, email, phone, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, username, password_hash, email, phone, now_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Username lookup is case-insensitive (NOCASE collation on the column).
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users WHERE username = ?1"
            ))?;
            let row = stmt.query_row([username], map_user).optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLS} FROM users WHERE id = ?1"))?;
            let row = stmt.query_row([id], map_user).optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLS} FROM users WHERE email = ?1"))?;
            let row = stmt.query_row([email], map_user).optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_phone(&self, phone: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLS} FROM users WHERE phone = ?1"))?;
            let row = stmt.query_row([phone], map_user).optional()?;
            Ok(row)
        })
    }

    pub fn update_password(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                rusqlite::params![password_hash, user_id],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn touch_last_login(&self, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
                rusqlite::params![now_rfc3339(), user_id],
            )?;
            Ok(())
        })
    }

    /// Partial, case-insensitive username search.
    pub fn search_users(&self, query: &str, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let pattern = format!("%{}%", query.replace('%', "").replace('_', ""));
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users WHERE username LIKE ?1 ORDER BY username LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![pattern, limit], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_active_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users WHERE active = 1 ORDER BY username"
            ))?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Threads --

    /// All non-group threads with exactly the two given participants,
    /// earliest first. More than one row means a historical duplicate;
    /// the resolver picks the first.
    pub fn find_direct_threads(&self, user_a: &str, user_b: &str) -> Result<Vec<ThreadRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.is_group, t.created_by, t.pair_key, t.hidden_for, t.created_at
                 FROM threads t
                 WHERE t.is_group = 0
                   AND EXISTS (SELECT 1 FROM thread_participants
                               WHERE thread_id = t.id AND user_id = ?1)
                   AND EXISTS (SELECT 1 FROM thread_participants
                               WHERE thread_id = t.id AND user_id = ?2)
                   AND (SELECT COUNT(*) FROM thread_participants
                        WHERE thread_id = t.id) = 2
                 ORDER BY t.id",
            )?;
            let rows = stmt
                .query_map([user_a, user_b], map_thread)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Create a direct thread plus both participant rows in one
    /// transaction. Fails with a constraint violation if a thread with
    /// the same pair_key already exists; the resolver handles that by
    /// re-reading.
    pub fn create_direct_thread(
        &self,
        pair_key: &str,
        created_by: &str,
        user_a: &str,
        user_b: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_rfc3339();
            tx.execute(
                "INSERT INTO threads (is_group, created_by, pair_key, created_at)
                 VALUES (0, ?1, ?2, ?3)",
                rusqlite::params![created_by, pair_key, now],
            )?;
            let thread_id = tx.last_insert_rowid();
            for user_id in [user_a, user_b] {
                tx.execute(
                    "INSERT INTO thread_participants (thread_id, user_id, joined_at)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![thread_id, user_id, now],
                )?;
            }
            tx.commit()?;
            Ok(thread_id)
        })
    }

    pub fn get_thread(&self, thread_id: i64) -> Result<Option<ThreadRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, is_group, created_by, pair_key, hidden_for, created_at
                 FROM threads WHERE id = ?1",
            )?;
            let row = stmt.query_row([thread_id], map_thread).optional()?;
            Ok(row)
        })
    }

    pub fn get_participants(&self, thread_id: i64) -> Result<Vec<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT thread_id, user_id, joined_at, last_read_message_id
                 FROM thread_participants WHERE thread_id = ?1",
            )?;
            let rows = stmt
                .query_map([thread_id], map_participant)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_participant(&self, thread_id: i64, user_id: &str) -> Result<Option<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT thread_id, user_id, joined_at, last_read_message_id
                 FROM thread_participants WHERE thread_id = ?1 AND user_id = ?2",
            )?;
            let row = stmt
                .query_row(rusqlite::params![thread_id, user_id], map_participant)
                .optional()?;
            Ok(row)
        })
    }

    /// Ids of every thread the user participates in, for the inbox.
    pub fn thread_ids_for_user(&self, user_id: &str) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT thread_id FROM thread_participants WHERE user_id = ?1")?;
            let rows = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Idempotently add the viewer to the thread's hide-set.
    /// Returns false if the thread does not exist.
    pub fn mark_thread_hidden_for(&self, thread_id: i64, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let raw: Option<String> = tx
                .query_row("SELECT hidden_for FROM threads WHERE id = ?1", [thread_id], |row| {
                    row.get(0)
                })
                .optional()?;
            let Some(raw) = raw else {
                return Ok(false);
            };
            let mut set: IdSet = serde_json::from_str(&raw).unwrap_or_default();
            if set.insert(user_id) {
                tx.execute(
                    "UPDATE threads SET hidden_for = ?1 WHERE id = ?2",
                    rusqlite::params![serde_json::to_string(&set)?, thread_id],
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    // -- Messages --

    /// Append a message to a thread: assigns the next per-thread
    /// message_index (max + 1, starting at 1), inserts the row, and
    /// advances the sender's read cursor — all in one transaction.
    /// The UNIQUE (thread_id, message_index) constraint catches any
    /// race; the sequencer retries on that.
    pub fn insert_message(
        &self,
        thread_id: i64,
        sender_id: &str,
        body: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<(i64, i64, String)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let next_index: i64 = tx.query_row(
                "SELECT COALESCE(MAX(message_index), 0) + 1 FROM messages WHERE thread_id = ?1",
                [thread_id],
                |row| row.get(0),
            )?;
            let now = now_rfc3339();
            tx.execute(
                "INSERT INTO messages (thread_id, sender_id, body, message_index,
                                       reply_to_message_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![thread_id, sender_id, body, next_index, reply_to_message_id, now],
            )?;
            let message_id = tx.last_insert_rowid();
            // The sender has implicitly read their own message.
            tx.execute(
                "UPDATE thread_participants SET last_read_message_id = ?1
                 WHERE thread_id = ?2 AND user_id = ?3
                   AND (last_read_message_id IS NULL OR last_read_message_id < ?1)",
                rusqlite::params![message_id, thread_id, sender_id],
            )?;
            tx.commit()?;
            Ok((message_id, next_index, now))
        })
    }

    pub fn get_message(&self, message_id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.id = ?1"
            ))?;
            let row = stmt.query_row([message_id], map_message).optional()?;
            Ok(row)
        })
    }

    /// All messages in a thread in message_index order. JOIN users to
    /// fetch sender_username in a single query (eliminates N+1).
    pub fn messages_for_thread(&self, thread_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.thread_id = ?1
                 ORDER BY m.message_index"
            ))?;
            let rows = stmt
                .query_map([thread_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn last_message(&self, thread_id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.thread_id = ?1
                 ORDER BY m.message_index DESC
                 LIMIT 1"
            ))?;
            let row = stmt.query_row([thread_id], map_message).optional()?;
            Ok(row)
        })
    }

    /// Messages the viewer has not read: id above their cursor (or all
    /// of them if the cursor is unset), excluding their own.
    pub fn unread_count(&self, thread_id: i64, viewer_id: &str) -> Result<i64> {
        let cursor = self
            .get_participant(thread_id, viewer_id)?
            .and_then(|p| p.last_read_message_id);
        self.with_conn(|conn| {
            let count = match cursor {
                Some(cursor) => conn.query_row(
                    "SELECT COUNT(*) FROM messages
                     WHERE thread_id = ?1 AND id > ?2 AND sender_id != ?3",
                    rusqlite::params![thread_id, cursor, viewer_id],
                    |row| row.get(0),
                )?,
                None => conn.query_row(
                    "SELECT COUNT(*) FROM messages
                     WHERE thread_id = ?1 AND sender_id != ?2",
                    rusqlite::params![thread_id, viewer_id],
                    |row| row.get(0),
                )?,
            };
            Ok(count)
        })
    }

    /// Forward-only cursor update; a backward move matches no row and
    /// is a silent no-op.
    pub fn advance_read_cursor(&self, thread_id: i64, user_id: &str, message_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE thread_participants SET last_read_message_id = ?1
                 WHERE thread_id = ?2 AND user_id = ?3
                   AND (last_read_message_id IS NULL OR last_read_message_id < ?1)",
                rusqlite::params![message_id, thread_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Idempotently add the viewer to the message's delete-set.
    /// Returns false if the message does not exist.
    pub fn mark_message_deleted_for(&self, message_id: i64, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let raw: Option<String> = tx
                .query_row(
                    "SELECT deleted_for FROM messages WHERE id = ?1",
                    [message_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(raw) = raw else {
                return Ok(false);
            };
            let mut set: IdSet = serde_json::from_str(&raw).unwrap_or_default();
            if set.insert(user_id) {
                tx.execute(
                    "UPDATE messages SET deleted_for = ?1 WHERE id = ?2",
                    rusqlite::params![serde_json::to_string(&set)?, message_id],
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    // -- Friend requests --

    /// The single request row between two users, in either direction.
    pub fn find_friend_request_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<FriendRequestRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FRIEND_COLS} FROM friend_requests
                 WHERE (requester_id = ?1 AND recipient_id = ?2)
                    OR (requester_id = ?2 AND recipient_id = ?1)"
            ))?;
            let row = stmt
                .query_row([user_a, user_b], map_friend_request)
                .optional()?;
            Ok(row)
        })
    }

    pub fn insert_friend_request(&self, requester_id: &str, recipient_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO friend_requests (requester_id, recipient_id, status, created_at)
                 VALUES (?1, ?2, 'pending', ?3)",
                rusqlite::params![requester_id, recipient_id, now_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_friend_request(&self, id: i64) -> Result<Option<FriendRequestRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FRIEND_COLS} FROM friend_requests WHERE id = ?1"
            ))?;
            let row = stmt.query_row([id], map_friend_request).optional()?;
            Ok(row)
        })
    }

    /// Re-send after a rejection: back to pending with a fresh timestamp.
    pub fn reset_friend_request_to_pending(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE friend_requests
                 SET status = 'pending', created_at = ?1, responded_at = NULL
                 WHERE id = ?2",
                rusqlite::params![now_rfc3339(), id],
            )?;
            Ok(())
        })
    }

    pub fn set_friend_request_status(&self, id: i64, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE friend_requests SET status = ?1, responded_at = ?2 WHERE id = ?3",
                rusqlite::params![status, now_rfc3339(), id],
            )?;
            Ok(())
        })
    }

    pub fn pending_requests_received(&self, user_id: &str) -> Result<Vec<FriendRequestRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FRIEND_COLS} FROM friend_requests
                 WHERE recipient_id = ?1 AND status = 'pending'
                 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([user_id], map_friend_request)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn pending_requests_sent(&self, user_id: &str) -> Result<Vec<FriendRequestRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FRIEND_COLS} FROM friend_requests
                 WHERE requester_id = ?1 AND status = 'pending'
                 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([user_id], map_friend_request)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn accepted_friendships(&self, user_id: &str) -> Result<Vec<FriendRequestRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FRIEND_COLS} FROM friend_requests
                 WHERE (requester_id = ?1 OR recipient_id = ?1) AND status = 'accepted'
                 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([user_id], map_friend_request)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_friend_request(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM friend_requests WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Notifications --

    pub fn insert_notification(
        &self,
        user_id: &str,
        kind: &str,
        title: &str,
        body: &str,
        from_user_id: Option<&str>,
        related_id: Option<i64>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (user_id, kind, from_user_id, related_id,
                                            title, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![user_id, kind, from_user_id, related_id, title, body, now_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn notifications_for_user(
        &self,
        user_id: &str,
        limit: u32,
        unread_only: bool,
    ) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let filter = if unread_only { "AND is_read = 0" } else { "" };
            let sql = format!(
                "SELECT {NOTIFICATION_COLS} FROM notifications
                 WHERE user_id = ?1 {filter}
                 ORDER BY id DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn notification_unread_count(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Marks only the caller's notifications; ids belonging to other
    /// users are left untouched.
    pub fn mark_notifications_read(&self, user_id: &str, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            let placeholders: Vec<String> = (2..=ids.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "UPDATE notifications SET is_read = 1
                 WHERE user_id = ?1 AND id IN ({})",
                placeholders.join(", ")
            );
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
            params.extend(ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));
            let updated = conn.execute(&sql, params.as_slice())?;
            Ok(updated)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id],
            )?;
            Ok(updated)
        })
    }

    pub fn get_notification(&self, id: i64) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTIFICATION_COLS} FROM notifications WHERE id = ?1"
            ))?;
            let row = stmt.query_row([id], map_notification).optional()?;
            Ok(row)
        })
    }

    pub fn delete_notification(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM notifications WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Invite links --

    #[allow(clippy::too_many_arguments)]
    pub fn insert_invite(
        &self,
        code: &str,
        created_by: &str,
        recipient1: (Option<&str>, Option<&str>, Option<&str>),
        recipient2: (Option<&str>, Option<&str>, Option<&str>),
        expires_at: Option<&str>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO invite_links
                     (code, created_by,
                      recipient1_username, recipient1_email, recipient1_phone,
                      recipient2_username, recipient2_email, recipient2_phone,
                      created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    code,
                    created_by,
                    recipient1.0,
                    recipient1.1,
                    recipient1.2,
                    recipient2.0,
                    recipient2.1,
                    recipient2.2,
                    now_rfc3339(),
                    expires_at
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_invite_by_code(&self, code: &str) -> Result<Option<InviteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INVITE_COLS} FROM invite_links WHERE code = ?1"
            ))?;
            let row = stmt.query_row([code], map_invite).optional()?;
            Ok(row)
        })
    }

    pub fn set_invite_accepted(&self, id: i64, recipient_number: u8) -> Result<()> {
        self.with_conn(|conn| {
            let column = match recipient_number {
                1 => "recipient1_accepted",
                _ => "recipient2_accepted",
            };
            conn.execute(
                &format!("UPDATE invite_links SET {column} = 1 WHERE id = ?1"),
                [id],
            )?;
            Ok(())
        })
    }

    pub fn set_invite_thread(&self, id: i64, thread_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE invite_links SET thread_id = ?1 WHERE id = ?2",
                rusqlite::params![thread_id, id],
            )?;
            Ok(())
        })
    }
}

// Column lists shared by the row mappers below.
const USER_COLS: &str =
    "id, username, password, email, phone, active, is_admin, created_at, last_login_at";
const MESSAGE_COLS: &str = "m.id, m.thread_id, m.sender_id, u.username, m.body, m.message_index,
     m.reply_to_message_id, m.deleted_for, m.created_at";
const FRIEND_COLS: &str = "id, requester_id, recipient_id, status, created_at, responded_at";
const NOTIFICATION_COLS: &str =
    "id, user_id, kind, from_user_id, related_id, title, body, is_read, created_at";
const INVITE_COLS: &str = "id, code,
     recipient1_username, recipient1_email, recipient1_phone, recipient1_accepted,
     recipient2_username, recipient2_email, recipient2_phone, recipient2_accepted,
     thread_id, created_by, created_at, expires_at";

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        active: row.get::<_, i64>(5)? != 0,
        is_admin: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
        last_login_at: row.get(8)?,
    })
}

fn map_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThreadRow> {
    Ok(ThreadRow {
        id: row.get(0)?,
        is_group: row.get::<_, i64>(1)? != 0,
        created_by: row.get(2)?,
        pair_key: row.get(3)?,
        hidden_for: parse_id_set(&row.get::<_, String>(4)?),
        created_at: row.get(5)?,
    })
}

fn map_participant(row: &rusqlite::Row<'_>) -> rusqlite::Result<ParticipantRow> {
    Ok(ParticipantRow {
        thread_id: row.get(0)?,
        user_id: row.get(1)?,
        joined_at: row.get(2)?,
        last_read_message_id: row.get(3)?,
    })
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        body: row.get(4)?,
        message_index: row.get(5)?,
        reply_to_message_id: row.get(6)?,
        deleted_for: parse_id_set(&row.get::<_, String>(7)?),
        created_at: row.get(8)?,
    })
}

fn map_friend_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendRequestRow> {
    Ok(FriendRequestRow {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        recipient_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        responded_at: row.get(5)?,
    })
}

fn map_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        from_user_id: row.get(3)?,
        related_id: row.get(4)?,
        title: row.get(5)?,
        body: row.get(6)?,
        is_read: row.get::<_, i64>(7)? != 0,
        created_at: row.get(8)?,
    })
}

fn map_invite(row: &rusqlite::Row<'_>) -> rusqlite::Result<InviteRow> {
    Ok(InviteRow {
        id: row.get(0)?,
        code: row.get(1)?,
        recipient1_username: row.get(2)?,
        recipient1_email: row.get(3)?,
        recipient1_phone: row.get(4)?,
        recipient1_accepted: row.get::<_, i64>(5)? != 0,
        recipient2_username: row.get(6)?,
        recipient2_email: row.get(7)?,
        recipient2_phone: row.get(8)?,
        recipient2_accepted: row.get::<_, i64>(9)? != 0,
        thread_id: row.get(10)?,
        created_by: row.get(11)?,
        created_at: row.get(12)?,
        expires_at: row.get(13)?,
    })
}

fn parse_id_set(raw: &str) -> IdSet {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, is_constraint_violation};

    fn db_with_users(usernames: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for name in usernames {
            db.create_user(&format!("uuid-{name}"), name, "hash", None, None)
                .unwrap();
        }
        db
    }

    #[test]
    fn duplicate_pair_key_is_rejected() {
        let db = db_with_users(&["alice", "bob"]);
        db.create_direct_thread("a:b", "uuid-alice", "uuid-alice", "uuid-bob")
            .unwrap();
        let err = db
            .create_direct_thread("a:b", "uuid-bob", "uuid-bob", "uuid-alice")
            .unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn duplicate_username_is_rejected_case_insensitively() {
        let db = db_with_users(&["alice"]);
        let err = db.create_user("uuid-2", "ALICE", "hash", None, None).unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn duplicate_message_index_is_rejected() {
        let db = db_with_users(&["alice", "bob"]);
        let tid = db
            .create_direct_thread("a:b", "uuid-alice", "uuid-alice", "uuid-bob")
            .unwrap();
        db.insert_message(tid, "uuid-alice", "hi", None).unwrap();
        let err = db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO messages (thread_id, sender_id, body, message_index, created_at)
                     VALUES (?1, ?2, 'dup', 1, '2026-01-01T00:00:00+00:00')",
                    rusqlite::params![tid, "uuid-bob"],
                )?;
                Ok(())
            })
            .unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn message_indices_start_at_one_and_increment() {
        let db = db_with_users(&["alice", "bob"]);
        let tid = db
            .create_direct_thread("a:b", "uuid-alice", "uuid-alice", "uuid-bob")
            .unwrap();
        let (_, idx1, _) = db.insert_message(tid, "uuid-alice", "hi", None).unwrap();
        let (_, idx2, _) = db.insert_message(tid, "uuid-bob", "hello", None).unwrap();
        assert_eq!(idx1, 1);
        assert_eq!(idx2, 2);
    }

    #[test]
    fn insert_message_advances_sender_cursor() {
        let db = db_with_users(&["alice", "bob"]);
        let tid = db
            .create_direct_thread("a:b", "uuid-alice", "uuid-alice", "uuid-bob")
            .unwrap();
        let (mid, _, _) = db.insert_message(tid, "uuid-alice", "hi", None).unwrap();
        let participant = db.get_participant(tid, "uuid-alice").unwrap().unwrap();
        assert_eq!(participant.last_read_message_id, Some(mid));
        // Recipient's cursor is untouched.
        let other = db.get_participant(tid, "uuid-bob").unwrap().unwrap();
        assert_eq!(other.last_read_message_id, None);
    }

    #[test]
    fn read_cursor_never_moves_backward() {
        let db = db_with_users(&["alice", "bob"]);
        let tid = db
            .create_direct_thread("a:b", "uuid-alice", "uuid-alice", "uuid-bob")
            .unwrap();
        let (m1, _, _) = db.insert_message(tid, "uuid-alice", "one", None).unwrap();
        let (m2, _, _) = db.insert_message(tid, "uuid-alice", "two", None).unwrap();
        db.advance_read_cursor(tid, "uuid-bob", m2).unwrap();
        db.advance_read_cursor(tid, "uuid-bob", m1).unwrap();
        let participant = db.get_participant(tid, "uuid-bob").unwrap().unwrap();
        assert_eq!(participant.last_read_message_id, Some(m2));
    }

    #[test]
    fn delete_set_append_is_idempotent() {
        let db = db_with_users(&["alice", "bob"]);
        let tid = db
            .create_direct_thread("a:b", "uuid-alice", "uuid-alice", "uuid-bob")
            .unwrap();
        let (mid, _, _) = db.insert_message(tid, "uuid-alice", "hi", None).unwrap();
        assert!(db.mark_message_deleted_for(mid, "uuid-bob").unwrap());
        assert!(db.mark_message_deleted_for(mid, "uuid-bob").unwrap());
        let msg = db.get_message(mid).unwrap().unwrap();
        assert!(msg.deleted_for.contains("uuid-bob"));
        assert_eq!(msg.deleted_for.len(), 1);
    }

    #[test]
    fn missing_message_reports_not_found() {
        let db = db_with_users(&["alice"]);
        assert!(!db.mark_message_deleted_for(999, "uuid-alice").unwrap());
        assert!(!db.mark_thread_hidden_for(999, "uuid-alice").unwrap());
    }
}
